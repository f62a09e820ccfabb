use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::{client_origin, current_session, see_other, session_cookie, ApiResponse, Page};
use crate::auth::{AuthError, Credentials};
use crate::throttle::MAX_ATTEMPTS;
use crate::AppState;

/// 登录表单，学号与用户名二选一
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(max = 32))]
    pub nis: Option<String>,
    #[validate(length(max = 255))]
    pub username: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub password: String,
    pub remember: Option<String>,
}

impl LoginForm {
    /// 复选框提交 "on"、"1" 或 "true"
    pub fn remember(&self) -> bool {
        matches!(
            self.remember.as_deref().map(str::trim),
            Some("on" | "1" | "true")
        )
    }
}

pub async fn show_login(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let existing = current_session(&req, &data);

    if let Some(user) = existing.as_ref().and_then(|s| s.user.as_ref()) {
        return see_other(user.role.dashboard_path()).finish();
    }

    let session = match existing {
        Some(guest) => guest,
        None => data.session_manager.start_guest(),
    };

    let token = match data.signer.generate_token(&session) {
        Ok(token) => token,
        Err(e) => {
            error!("生成访客会话 token 失败: {}", e);
            return HttpResponse::InternalServerError().json(ApiResponse {
                success: false,
                message: "服务器内部错误".to_string(),
                data: None,
            });
        }
    };

    HttpResponse::Ok()
        .cookie(session_cookie(token, &session, data.cookie_secure))
        .json(Page {
            component: "Auth/Login",
            url: "/login".to_string(),
            props: json!({
                "fields": ["nis", "username", "password", "remember"],
                "max_attempts": MAX_ATTEMPTS,
            }),
        })
}

pub async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, AuthError> {
    info!("开始处理登录请求");

    if let Err(e) = form.validate() {
        warn!("登录表单验证失败: {}", e);
        return Err(AuthError::Validation("登录信息格式不正确".to_string()));
    }

    let origin = client_origin(&req);
    let previous = current_session(&req, &data).map(|s| s.id);

    let credentials = Credentials {
        nis: form.nis.as_deref(),
        username: form.username.as_deref(),
        password: &form.password,
    };
    let account = data.auth_manager.attempt(credentials, &origin).await?;

    let session = data
        .session_manager
        .establish(previous.as_deref(), &account, form.remember());
    let token = data.signer.generate_token(&session).map_err(|e| {
        data.session_manager.revoke(&session.id);
        AuthError::Unavailable(format!("生成会话 token 失败: {}", e))
    })?;

    let destination = account.role.dashboard_path();
    info!("账号 {} 登录成功，跳转到 {}", account.id, destination);

    Ok(see_other(destination)
        .cookie(session_cookie(token, &session, data.cookie_secure))
        .json(ApiResponse {
            success: true,
            message: "登录成功".to_string(),
            data: Some(json!({
                "redirect": destination,
                "user": {
                    "id": account.id,
                    "name": account.name,
                    "role": account.role,
                }
            })),
        }))
}
