use crate::auth::StoreError;
use crate::throttle::storage::CounterStore;
use crate::throttle::types::{Counter, ThrottleKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::PgPool;
use std::time::Duration;

/// 多进程共享的计数存储，单条语句完成加一与过期判断
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type CounterRow = (i32, DateTime<Utc>);

fn to_counter((attempts, expires_at): CounterRow) -> Counter {
    Counter {
        attempts: attempts.max(0) as u32,
        expires_at,
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn hit(&self, key: &ThrottleKey, window: Duration) -> Result<Counter, StoreError> {
        let row: CounterRow = sqlx::query_as(
            r#"
            INSERT INTO throttle_counters (key_hash, attempts, expires_at)
            VALUES ($1, 1, NOW() + make_interval(secs => $2))
            ON CONFLICT (key_hash) DO UPDATE SET
                attempts = CASE
                    WHEN throttle_counters.expires_at <= NOW() THEN 1
                    ELSE throttle_counters.attempts + 1
                END,
                expires_at = CASE
                    WHEN throttle_counters.expires_at <= NOW() THEN EXCLUDED.expires_at
                    ELSE throttle_counters.expires_at
                END
            RETURNING attempts, expires_at
            "#,
        )
        .bind(key.digest())
        .bind(window.as_secs_f64())
        .fetch_one(&self.pool)
        .await?;

        Ok(to_counter(row))
    }

    async fn release(&self, key: &ThrottleKey) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE throttle_counters SET attempts = attempts - 1 \
             WHERE key_hash = $1 AND attempts > 0 AND expires_at > NOW()",
        )
        .bind(key.digest())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &ThrottleKey) -> Result<Option<Counter>, StoreError> {
        let row: Option<CounterRow> = sqlx::query_as(
            "SELECT attempts, expires_at FROM throttle_counters WHERE key_hash = $1 AND expires_at > NOW()",
        )
        .bind(key.digest())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(to_counter))
    }

    async fn clear(&self, key: &ThrottleKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM throttle_counters WHERE key_hash = $1")
            .bind(key.digest())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM throttle_counters WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        debug!("数据库计数清理了 {} 条", result.rows_affected());
        Ok(result.rows_affected())
    }
}
