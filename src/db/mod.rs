mod accounts;

pub use accounts::PgAccountStore;

use crate::auth::StoreError;
use log::{error, info};
use sqlx::PgPool;

pub struct DbInitializer {
    pool: PgPool,
}

impl DbInitializer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 初始化账号与学生档案表
    pub async fn init_account_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR NOT NULL,
                username VARCHAR UNIQUE,
                password_hash VARCHAR NOT NULL,
                role VARCHAR NOT NULL CHECK (role IN ('admin', 'teacher', 'parent', 'student')),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_profiles (
                id BIGSERIAL PRIMARY KEY,
                nis VARCHAR UNIQUE,
                account_id BIGINT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_student_profiles_account ON student_profiles(account_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 初始化登录限流计数表
    pub async fn init_throttle_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS throttle_counters (
                key_hash VARCHAR(64) PRIMARY KEY,
                attempts INTEGER NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_throttle_counters_expires ON throttle_counters(expires_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// 初始化所有数据库表
pub async fn initialize_db(pool: PgPool) -> Result<(), StoreError> {
    info!("开始初始化数据库...");
    let initializer = DbInitializer::new(pool);

    initializer.init_account_tables().await.map_err(|e| {
        error!("账号表初始化失败: {:?}", e);
        e
    })?;

    initializer.init_throttle_tables().await.map_err(|e| {
        error!("限流表初始化失败: {:?}", e);
        e
    })?;

    info!("数据库初始化完成");
    Ok(())
}
