use crate::auth::{Account, AccountStore, Role, StoreError, StudentProfile};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    name: String,
    username: Option<String>,
    password_hash: String,
    role: String,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("账号 {}: {}", row.id, e)))?;
        Ok(Account {
            id: row.id,
            name: row.name,
            username: row.username,
            password_hash: row.password_hash,
            role,
        })
    }
}

#[derive(Debug, FromRow)]
struct StudentProfileRow {
    id: i64,
    nis: String,
    account_id: i64,
}

impl From<StudentProfileRow> for StudentProfile {
    fn from(row: StudentProfileRow) -> Self {
        StudentProfile {
            id: row.id,
            nis: row.nis,
            account_id: row.account_id,
        }
    }
}

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_student_profile(&self, nis: &str) -> Result<Option<StudentProfile>, StoreError> {
        let row: Option<StudentProfileRow> =
            sqlx::query_as("SELECT id, nis, account_id FROM student_profiles WHERE nis = $1")
                .bind(nis)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(StudentProfile::from))
    }

    async fn find_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, name, username, password_hash, role FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Account::try_from).transpose()
    }

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, name, username, password_hash, role FROM accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Account::try_from).transpose()
    }
}
