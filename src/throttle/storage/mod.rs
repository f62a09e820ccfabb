use crate::auth::StoreError;
use crate::throttle::types::{Counter, ThrottleKey};
use async_trait::async_trait;
use std::time::Duration;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCounterStore;
pub use postgres::PgCounterStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 原子地加一并返回当前计数，窗口过期或不存在时从 1 开始新窗口
    async fn hit(&self, key: &ThrottleKey, window: Duration) -> Result<Counter, StoreError>;

    /// 退还一次计数，只作用于未过期且大于 0 的计数
    async fn release(&self, key: &ThrottleKey) -> Result<(), StoreError>;

    /// 获取未过期的计数
    async fn get(&self, key: &ThrottleKey) -> Result<Option<Counter>, StoreError>;

    /// 删除计数
    async fn clear(&self, key: &ThrottleKey) -> Result<(), StoreError>;

    /// 清理所有过期计数，返回清理数量
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}
