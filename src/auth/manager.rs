use crate::auth::error::AuthError;
use crate::auth::resolver::{pad_student_number, CredentialResolver};
use crate::auth::types::{Account, Identifier};
use crate::throttle::{AttemptThrottle, ThrottleKey};
use log::{debug, info, warn};

/// 一次登录提交
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub nis: Option<&'a str>,
    pub username: Option<&'a str>,
    pub password: &'a str,
}

/// 登录编排：标识校验 -> 限流占位 -> 凭据解析 -> 成功清零
pub struct AuthManager {
    resolver: CredentialResolver,
    throttle: AttemptThrottle,
}

impl AuthManager {
    pub fn new(resolver: CredentialResolver, throttle: AttemptThrottle) -> Self {
        info!("初始化认证管理器");
        Self { resolver, throttle }
    }

    pub fn throttle(&self) -> &AttemptThrottle {
        &self.throttle
    }

    pub async fn attempt(&self, credentials: Credentials<'_>, origin: &str) -> Result<Account, AuthError> {
        let identifier = Identifier::from_fields(credentials.nis, credentials.username)
            .ok_or(AuthError::MissingIdentifier)?;

        if credentials.password.is_empty() {
            return Err(AuthError::Validation("请输入密码".to_string()));
        }

        let key = throttle_key(&identifier, origin);
        debug!("检查限流键 {}", key);
        if self.throttle.is_blocked(&key).await {
            let retry_after = self.throttle.time_until_unblocked(&key).await;
            warn!("限流键 {} 登录尝试次数过多", key);
            return Err(AuthError::Throttled { retry_after });
        }

        // 先占用尝试机会再校验密码，失败的尝试已经计入
        if let Err(retry_after) = self.throttle.try_acquire(&key).await {
            warn!("限流键 {} 并发尝试超出上限", key);
            return Err(AuthError::Throttled { retry_after });
        }

        match self.resolver.resolve(&identifier, credentials.password).await {
            Ok(account) => {
                self.throttle.clear(&key).await;
                Ok(account)
            }
            Err(AuthError::InvalidCredentials) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                self.throttle.release(&key).await;
                Err(e)
            }
        }
    }
}

/// 学号按补零后的规范形式计数，"25001" 与 "2500100000" 共用一个键
fn throttle_key(identifier: &Identifier, origin: &str) -> ThrottleKey {
    match identifier {
        Identifier::StudentNumber(nis) => {
            let canonical = pad_student_number(nis).unwrap_or_else(|| nis.clone());
            ThrottleKey::new(&canonical, origin)
        }
        Identifier::Username(username) => ThrottleKey::new(username, origin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::StoreError;
    use crate::auth::store::MockAccountStore;
    use crate::auth::types::{Role, StudentProfile};
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::throttle::{MemoryCounterStore, MAX_ATTEMPTS};
    use std::sync::Arc;
    use std::time::Duration;

    const ORIGIN: &str = "192.168.1.20";

    fn student_store() -> MockAccountStore {
        let hash = bcrypt::hash("rahasia", 4).unwrap();
        let mut store = MockAccountStore::new();
        store.expect_find_student_profile().returning(|nis| {
            Ok((nis == "2500100000").then(|| StudentProfile {
                id: 1,
                nis: nis.to_string(),
                account_id: 11,
            }))
        });
        store.expect_find_account().returning(move |id| {
            Ok(Some(Account {
                id,
                name: "Siti".to_string(),
                username: None,
                password_hash: hash.clone(),
                role: Role::Student,
            }))
        });
        store
    }

    fn manager(store: MockAccountStore) -> AuthManager {
        AuthManager::new(
            CredentialResolver::new(Arc::new(store)),
            AttemptThrottle::new(Arc::new(MemoryCounterStore::new()), Duration::from_secs(900)),
        )
    }

    fn by_nis<'a>(nis: &'a str, password: &'a str) -> Credentials<'a> {
        Credentials {
            nis: Some(nis),
            username: None,
            password,
        }
    }

    #[tokio::test]
    async fn missing_identifier_is_rejected_before_lookup() {
        // 未设置任何期望，调用存储会直接 panic
        let auth = manager(MockAccountStore::new());
        let err = auth
            .attempt(
                Credentials {
                    nis: Some(""),
                    username: None,
                    password: "rahasia",
                },
                ORIGIN,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingIdentifier));
    }

    #[tokio::test]
    async fn empty_password_is_a_validation_failure() {
        let auth = manager(MockAccountStore::new());
        let err = auth.attempt(by_nis("2500100000", ""), ORIGIN).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn padded_student_number_logs_in() {
        let auth = manager(student_store());
        let account = auth.attempt(by_nis("25001", "rahasia"), ORIGIN).await.unwrap();
        assert_eq!(account.id, 11);
    }

    #[tokio::test]
    async fn wrong_password_counts_as_failure() {
        let auth = manager(student_store());
        let err = auth
            .attempt(by_nis("2500100000", "salah"), ORIGIN)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let key = ThrottleKey::new("2500100000", ORIGIN);
        for _ in 1..MAX_ATTEMPTS {
            assert!(!auth.throttle().is_blocked(&key).await);
            auth.throttle().try_acquire(&key).await.unwrap();
        }
        assert!(auth.throttle().is_blocked(&key).await);
    }

    #[tokio::test]
    async fn short_student_numbers_share_one_counter() {
        let auth = manager(student_store());
        for nis in ["25001", "250010", "2500100", "25001000", "250010000"] {
            let err = auth.attempt(by_nis(nis, "salah"), ORIGIN).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = auth
            .attempt(by_nis("2500100000", "rahasia"), ORIGIN)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Throttled { .. }));
    }

    #[tokio::test]
    async fn storage_failure_does_not_use_up_attempts() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_student_profile()
            .returning(|_| Err(StoreError::Corrupt("offline".to_string())));
        let auth = manager(store);

        for _ in 0..MAX_ATTEMPTS + 2 {
            let err = auth
                .attempt(by_nis("2500100000", "rahasia"), ORIGIN)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::Unavailable(_)));
        }
        assert!(!auth
            .throttle()
            .is_blocked(&ThrottleKey::new("2500100000", ORIGIN))
            .await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_guesses_are_capped() {
        let hash = bcrypt::hash("rahasia", 4).unwrap();
        let verified = Arc::new(AtomicU32::new(0));
        let mut store = MockAccountStore::new();
        store.expect_find_student_profile().returning(|nis| {
            Ok(Some(StudentProfile {
                id: 1,
                nis: nis.to_string(),
                account_id: 11,
            }))
        });
        let counter = verified.clone();
        store.expect_find_account().returning(move |id| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Account {
                id,
                name: "Siti".to_string(),
                username: None,
                password_hash: hash.clone(),
                role: Role::Student,
            }))
        });
        let auth = Arc::new(manager(store));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let auth = auth.clone();
                tokio::spawn(async move {
                    let password = format!("tebakan-{}", i);
                    auth.attempt(by_nis("2500100000", &password), ORIGIN).await
                })
            })
            .collect();

        let mut throttled = 0;
        for task in tasks {
            match task.await.unwrap() {
                Err(AuthError::Throttled { .. }) => throttled += 1,
                Err(AuthError::InvalidCredentials) => {}
                other => panic!("unexpected result {:?}", other),
            }
        }

        assert_eq!(verified.load(Ordering::SeqCst), MAX_ATTEMPTS);
        assert_eq!(throttled, 20 - MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn sixth_attempt_is_throttled_even_with_correct_password() {
        let auth = manager(student_store());
        for _ in 0..MAX_ATTEMPTS {
            let err = auth
                .attempt(by_nis("2500100000", "salah"), ORIGIN)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = auth
            .attempt(by_nis("2500100000", "rahasia"), ORIGIN)
            .await
            .unwrap_err();
        match err {
            AuthError::Throttled { retry_after } => assert!(retry_after > Duration::ZERO),
            other => panic!("expected throttled, got {:?}", other),
        }

        // 其他来源不受影响
        assert!(auth
            .attempt(by_nis("2500100000", "rahasia"), "192.168.1.21")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn success_clears_previous_failures() {
        let auth = manager(student_store());
        for _ in 0..MAX_ATTEMPTS - 1 {
            let _ = auth.attempt(by_nis("2500100000", "salah"), ORIGIN).await;
        }
        auth.attempt(by_nis("2500100000", "rahasia"), ORIGIN)
            .await
            .unwrap();

        let key = ThrottleKey::new("2500100000", ORIGIN);
        let _ = auth.attempt(by_nis("2500100000", "salah"), ORIGIN).await;
        assert!(!auth.throttle().is_blocked(&key).await);
    }
}
