use crate::auth::error::StoreError;
use crate::auth::types::{Account, StudentProfile};
use async_trait::async_trait;

/// 认证核心对账号数据的只读访问
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 按学号精确查找学生档案
    async fn find_student_profile(&self, nis: &str) -> Result<Option<StudentProfile>, StoreError>;

    /// 按主键查找账号
    async fn find_account(&self, id: i64) -> Result<Option<Account>, StoreError>;

    /// 按用户名精确查找账号，不区分角色
    async fn find_account_by_username(&self, username: &str)
        -> Result<Option<Account>, StoreError>;
}
