use crate::auth::error::AuthError;
use crate::auth::store::AccountStore;
use crate::auth::types::{Account, Identifier, IdentifierKind, STUDENT_NUMBER_WIDTH};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// 把登录标识解析为唯一账号并校验密码
pub struct CredentialResolver {
    store: Arc<dyn AccountStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, identifier: &Identifier, password: &str) -> Result<Account, AuthError> {
        let candidate = match identifier {
            Identifier::StudentNumber(nis) => self.find_student(nis).await?,
            Identifier::Username(username) => self.find_by_username(username).await?,
        };

        let account = match candidate {
            Some(account) => account,
            None => {
                warn!("登录标识 {} 未匹配到可用账号", identifier.value());
                return Err(AuthError::InvalidCredentials);
            }
        };

        if verify_password(password, &account.password_hash).await? {
            info!("账号 {} ({}) 认证成功", account.id, account.role);
            Ok(account)
        } else {
            warn!("账号 {} 密码错误", account.id);
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn find_student(&self, nis: &str) -> Result<Option<Account>, AuthError> {
        let mut profile = self.store.find_student_profile(nis).await?;

        if profile.is_none() {
            if let Some(padded) = pad_student_number(nis) {
                debug!("学号 {} 未找到，补零后重试: {}", nis, padded);
                profile = self.store.find_student_profile(&padded).await?;
            }
        }

        let profile = match profile {
            Some(p) => p,
            None => return Ok(None),
        };

        let account = self.store.find_account(profile.account_id).await?;
        Ok(account.filter(|a| {
            let accepted = a.role.accepts(IdentifierKind::StudentNumber);
            if !accepted {
                error!(
                    "学生档案 {} 关联的账号 {} 角色为 {}，拒绝登录",
                    profile.id, a.id, a.role
                );
            }
            accepted
        }))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AuthError> {
        let account = self.store.find_account_by_username(username).await?;
        Ok(account.filter(|a| {
            let accepted = a.role.accepts(IdentifierKind::Username);
            if !accepted {
                warn!("账号 {} 角色为 {}，不能使用用户名登录", a.id, a.role);
            }
            accepted
        }))
    }
}

/// 不足规范长度的学号右侧补零，已达到或超过长度的返回 None
pub fn pad_student_number(nis: &str) -> Option<String> {
    if nis.chars().count() < STUDENT_NUMBER_WIDTH {
        Some(format!("{:0<width$}", nis, width = STUDENT_NUMBER_WIDTH))
    } else {
        None
    }
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    debug!("验证密码");
    let password = password.to_string();
    let hash = hash.to_string();

    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Unavailable(format!("密码验证任务失败: {}", e)))?;

    match result {
        Ok(matched) => Ok(matched),
        Err(e) => {
            // 哈希格式损坏时按密码错误处理
            error!("密码验证过程出错: {}", e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::StoreError;
    use crate::auth::store::MockAccountStore;
    use crate::auth::types::{Role, StudentProfile};
    use mockall::predicate::eq;

    fn account(id: i64, role: Role, username: Option<&str>, password: &str) -> Account {
        Account {
            id,
            name: format!("account {}", id),
            username: username.map(str::to_string),
            password_hash: bcrypt::hash(password, 4).unwrap(),
            role,
        }
    }

    fn profile(nis: &str, account_id: i64) -> StudentProfile {
        StudentProfile {
            id: 100 + account_id,
            nis: nis.to_string(),
            account_id,
        }
    }

    fn resolver(store: MockAccountStore) -> CredentialResolver {
        CredentialResolver::new(Arc::new(store))
    }

    #[test]
    fn pads_only_short_numbers() {
        assert_eq!(pad_student_number("25001").as_deref(), Some("2500100000"));
        assert_eq!(pad_student_number("123456789").as_deref(), Some("1234567890"));
        assert_eq!(pad_student_number("2500100000"), None);
        assert_eq!(pad_student_number("25001000001"), None);
    }

    #[tokio::test]
    async fn canonical_student_number_authenticates() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_student_profile()
            .withf(|nis: &str| nis == "2500100001")
            .times(1)
            .returning(|nis| Ok(Some(profile(nis, 7))));
        store
            .expect_find_account()
            .with(eq(7))
            .returning(|id| Ok(Some(account(id, Role::Student, None, "rahasia"))));

        let found = resolver(store)
            .resolve(&Identifier::StudentNumber("2500100001".to_string()), "rahasia")
            .await
            .unwrap();
        assert_eq!(found.id, 7);
        assert_eq!(found.role, Role::Student);
    }

    #[tokio::test]
    async fn short_student_number_is_padded_once() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_student_profile()
            .withf(|nis: &str| nis == "25001")
            .times(1)
            .returning(|_| Ok(None));
        store
            .expect_find_student_profile()
            .withf(|nis: &str| nis == "2500100000")
            .times(1)
            .returning(|nis| Ok(Some(profile(nis, 8))));
        store
            .expect_find_account()
            .with(eq(8))
            .returning(|id| Ok(Some(account(id, Role::Student, None, "rahasia"))));

        let found = resolver(store)
            .resolve(&Identifier::StudentNumber("25001".to_string()), "rahasia")
            .await
            .unwrap();
        assert_eq!(found.id, 8);
    }

    #[tokio::test]
    async fn full_width_miss_is_not_retried() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_student_profile()
            .times(1)
            .returning(|_| Ok(None));

        let err = resolver(store)
            .resolve(&Identifier::StudentNumber("9999999999".to_string()), "rahasia")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn student_number_never_authenticates_other_roles() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_student_profile()
            .returning(|nis| Ok(Some(profile(nis, 3))));
        store
            .expect_find_account()
            .returning(|id| Ok(Some(account(id, Role::Teacher, Some("guru"), "rahasia"))));

        let err = resolver(store)
            .resolve(&Identifier::StudentNumber("2500100003".to_string()), "rahasia")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn student_username_is_rejected_even_with_correct_password() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_account_by_username()
            .withf(|u: &str| u == "siswa")
            .returning(|_| Ok(Some(account(9, Role::Student, Some("siswa"), "rahasia"))));

        let err = resolver(store)
            .resolve(&Identifier::Username("siswa".to_string()), "rahasia")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn staff_username_authenticates() {
        for role in [Role::Admin, Role::Teacher, Role::Parent] {
            let mut store = MockAccountStore::new();
            store
                .expect_find_account_by_username()
                .returning(move |u| Ok(Some(account(1, role, Some(u), "rahasia"))));

            let found = resolver(store)
                .resolve(&Identifier::Username("staf".to_string()), "rahasia")
                .await
                .unwrap();
            assert_eq!(found.role, role);
        }
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_account_by_username()
            .returning(|u| Ok(Some(account(2, Role::Parent, Some(u), "rahasia"))));

        let err = resolver(store)
            .resolve(&Identifier::Username("wali".to_string()), "salah")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn malformed_hash_is_invalid_credentials() {
        let mut store = MockAccountStore::new();
        store.expect_find_account_by_username().returning(|u| {
            Ok(Some(Account {
                password_hash: "not-a-bcrypt-hash".to_string(),
                ..account(4, Role::Admin, Some(u), "rahasia")
            }))
        });

        let err = resolver(store)
            .resolve(&Identifier::Username("admin".to_string()), "rahasia")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn store_failure_is_unavailable() {
        let mut store = MockAccountStore::new();
        store
            .expect_find_account_by_username()
            .returning(|_| Err(StoreError::Corrupt("bad row".to_string())));

        let err = resolver(store)
            .resolve(&Identifier::Username("admin".to_string()), "rahasia")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unavailable(_)));
    }
}
