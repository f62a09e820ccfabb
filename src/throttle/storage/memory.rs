use crate::auth::StoreError;
use crate::throttle::storage::CounterStore;
use crate::throttle::types::{Counter, ThrottleKey};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// 单进程内的计数存储
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, Counter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Counter>> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &ThrottleKey, window: Duration) -> Result<Counter, StoreError> {
        let now = Utc::now();
        let mut counters = self.lock();
        let counter = counters
            .entry(key.as_str().to_string())
            .and_modify(|c| {
                if c.is_expired(now) {
                    *c = Counter::start(now, window);
                } else {
                    c.attempts += 1;
                }
            })
            .or_insert_with(|| Counter::start(now, window));
        Ok(*counter)
    }

    async fn release(&self, key: &ThrottleKey) -> Result<(), StoreError> {
        let now = Utc::now();
        if let Some(counter) = self.lock().get_mut(key.as_str()) {
            if !counter.is_expired(now) {
                counter.attempts = counter.attempts.saturating_sub(1);
            }
        }
        Ok(())
    }

    async fn get(&self, key: &ThrottleKey) -> Result<Option<Counter>, StoreError> {
        let now = Utc::now();
        Ok(self
            .lock()
            .get(key.as_str())
            .filter(|c| !c.is_expired(now))
            .copied())
    }

    async fn clear(&self, key: &ThrottleKey) -> Result<(), StoreError> {
        self.lock().remove(key.as_str());
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut counters = self.lock();
        let before = counters.len();
        counters.retain(|_, c| !c.is_expired(now));
        let purged = (before - counters.len()) as u64;
        debug!("内存计数清理了 {} 条", purged);
        Ok(purged)
    }
}
