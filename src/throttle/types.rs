use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;
use unicode_normalization::UnicodeNormalization;

static COMBINING_MARKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{M}+").expect("combining mark pattern"));

/// 限流键：规范化后的登录标识 + 客户端来源
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey(String);

impl ThrottleKey {
    pub fn new(identifier: &str, origin: &str) -> Self {
        ThrottleKey(format!(
            "{}|{}",
            normalize_identifier(identifier),
            origin.trim().to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 持久化时只保存键的摘要
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for ThrottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 小写并去掉变音符号，"Ádi" 与 "adi" 落到同一个键
pub fn normalize_identifier(identifier: &str) -> String {
    let decomposed: String = identifier.trim().nfkd().collect();
    COMBINING_MARKS
        .replace_all(&decomposed, "")
        .to_lowercase()
}

/// 一个窗口内的失败计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub attempts: u32,
    pub expires_at: DateTime<Utc>,
}

impl Counter {
    pub fn start(now: DateTime<Utc>, window: Duration) -> Self {
        Counter {
            attempts: 1,
            expires_at: now + to_chrono(window),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

fn to_chrono(window: Duration) -> chrono::Duration {
    chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(365))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_case_and_accent_insensitive() {
        assert_eq!(
            ThrottleKey::new("  Ádi.Guru ", "10.0.0.1"),
            ThrottleKey::new("adi.guru", "10.0.0.1")
        );
        assert_eq!(ThrottleKey::new("Ñandú", "::1").as_str(), "nandu|::1");
    }

    #[test]
    fn key_is_scoped_per_origin() {
        let a = ThrottleKey::new("2500100000", "10.0.0.1");
        let b = ThrottleKey::new("2500100000", "10.0.0.2");
        assert_ne!(a, b);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn digest_is_sha256_hex() {
        let digest = ThrottleKey::new("admin", "127.0.0.1").digest();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn counter_remaining_never_negative() {
        let now = Utc::now();
        let counter = Counter::start(now, Duration::from_secs(60));
        assert_eq!(counter.remaining(now), Duration::from_secs(60));
        assert!(!counter.is_expired(now));

        let later = now + chrono::Duration::seconds(61);
        assert!(counter.is_expired(later));
        assert_eq!(counter.remaining(later), Duration::ZERO);
    }
}
