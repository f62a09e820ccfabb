use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// 登录表单错误统一挂在这个字段下
pub const LOGIN_ERROR_FIELD: &str = "login_error";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据损坏: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("请输入学号或用户名")]
    MissingIdentifier,

    #[error("{0}")]
    Validation(String),

    #[error("登录尝试次数过多，请在 {} 秒后重试", retry_after_secs(.retry_after))]
    Throttled { retry_after: Duration },

    #[error("账号或密码错误")]
    InvalidCredentials,

    #[error("服务器内部错误")]
    Unavailable(String),
}

fn retry_after_secs(retry_after: &Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Unavailable(e.to_string())
    }
}

// 表单错误响应体
#[derive(Debug, Serialize)]
pub struct FormErrorResponse {
    pub success: bool,
    pub message: String,
    pub errors: HashMap<&'static str, String>,
}

impl FormErrorResponse {
    pub fn new(message: String) -> Self {
        let mut errors = HashMap::new();
        errors.insert(LOGIN_ERROR_FIELD, message.clone());
        Self {
            success: false,
            message,
            errors,
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingIdentifier
            | AuthError::Validation(_)
            | AuthError::InvalidCredentials => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let AuthError::Throttled { retry_after } = self {
            builder.insert_header(("Retry-After", retry_after_secs(retry_after).to_string()));
        }
        builder.json(FormErrorResponse::new(self.to_string()))
    }
}
