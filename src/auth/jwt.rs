use crate::auth::session::Session;
use crate::auth::types::Claims;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error};

/// 会话 cookie 的签名与校验
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        debug!("验证会话 token");
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }

    pub fn generate_token(&self, session: &Session) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: session
                .user
                .as_ref()
                .map(|u| u.account_id.to_string())
                .unwrap_or_default(),
            sid: session.id.clone(),
            exp: session.expires_at.timestamp().max(0) as usize,
            name: session.user.as_ref().map(|u| u.name.clone()),
            role: session.user.as_ref().map(|u| u.role),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            error!("生成会话 token 失败: {}", e);
            e
        })
    }
}
