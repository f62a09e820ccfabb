use crate::throttle::storage::CounterStore;
use crate::throttle::types::ThrottleKey;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// 每个键在窗口内允许的失败次数
pub const MAX_ATTEMPTS: u32 = 5;

/// 登录失败限流器。存储出错时只记录日志，不向调用方抛错
#[derive(Clone)]
pub struct AttemptThrottle {
    store: Arc<dyn CounterStore>,
    max_attempts: u32,
    window: Duration,
}

impl AttemptThrottle {
    pub fn new(store: Arc<dyn CounterStore>, window: Duration) -> Self {
        info!(
            "初始化登录限流器: 最多 {} 次失败, 窗口 {} 秒",
            MAX_ATTEMPTS,
            window.as_secs()
        );
        Self {
            store,
            max_attempts: MAX_ATTEMPTS,
            window,
        }
    }

    pub async fn is_blocked(&self, key: &ThrottleKey) -> bool {
        match self.store.get(key).await {
            Ok(Some(counter)) => {
                let blocked = counter.attempts >= self.max_attempts;
                if blocked {
                    warn!("限流键 {} 已被锁定，失败次数: {}", key, counter.attempts);
                }
                blocked
            }
            Ok(None) => false,
            Err(e) => {
                error!("读取限流计数失败 {}: {}", key, e);
                false
            }
        }
    }

    /// 在校验密码之前占用一次尝试机会。计数加一与判断在同一次存储操作里完成，
    /// 并发请求不会同时越过上限。被拒绝时返回剩余等待时间
    pub async fn try_acquire(&self, key: &ThrottleKey) -> Result<(), Duration> {
        match self.store.hit(key, self.window).await {
            Ok(counter) if counter.attempts > self.max_attempts => {
                warn!("限流键 {} 超出尝试上限，当前计数: {}", key, counter.attempts);
                Err(counter.remaining(Utc::now()))
            }
            Ok(counter) => {
                debug!("限流键 {} 占用第 {} 次尝试", key, counter.attempts);
                Ok(())
            }
            Err(e) => {
                error!("记录登录尝试出错 {}: {}", key, e);
                Ok(())
            }
        }
    }

    /// 退还一次尝试机会，用于不应计为失败的结果
    pub async fn release(&self, key: &ThrottleKey) {
        if let Err(e) = self.store.release(key).await {
            error!("退还登录尝试出错 {}: {}", key, e);
        }
    }

    pub async fn time_until_unblocked(&self, key: &ThrottleKey) -> Duration {
        match self.store.get(key).await {
            Ok(Some(counter)) if counter.attempts >= self.max_attempts => {
                counter.remaining(Utc::now())
            }
            Ok(_) => Duration::ZERO,
            Err(e) => {
                error!("读取限流计数失败 {}: {}", key, e);
                Duration::ZERO
            }
        }
    }

    pub async fn clear(&self, key: &ThrottleKey) {
        debug!("清除限流键 {}", key);
        if let Err(e) = self.store.clear(key).await {
            error!("清除限流计数失败 {}: {}", key, e);
        }
    }

    /// 清理过期计数
    pub async fn cleanup_expired(&self) {
        match self.store.purge_expired().await {
            Ok(purged) => info!("清理了 {} 个过期的限流计数", purged),
            Err(e) => error!("清理限流计数失败: {}", e),
        }
    }
}
