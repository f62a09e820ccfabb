mod manager;
pub mod storage;
mod types;

pub use manager::{AttemptThrottle, MAX_ATTEMPTS};
pub use storage::{CounterStore, MemoryCounterStore, PgCounterStore};
pub use types::ThrottleKey;
