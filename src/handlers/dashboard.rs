use actix_web::{web, HttpResponse};
use log::{debug, warn};
use serde_json::json;

use super::{see_other, ApiResponse, Page};
use crate::auth::{Role, Session};

/// 按角色跳转到对应的落地页
pub async fn dashboard(session: web::ReqData<Session>) -> HttpResponse {
    match &session.user {
        Some(user) => see_other(user.role.dashboard_path()).finish(),
        None => see_other("/login").finish(),
    }
}

pub async fn role_dashboard(path: web::Path<String>, session: web::ReqData<Session>) -> HttpResponse {
    let role: Role = match path.parse() {
        Ok(role) => role,
        Err(e) => {
            debug!("{}", e);
            return HttpResponse::NotFound().json(ApiResponse {
                success: false,
                message: "页面不存在".to_string(),
                data: None,
            });
        }
    };

    let user = match &session.user {
        Some(user) => user,
        None => return see_other("/login").finish(),
    };

    if user.role != role {
        warn!("账号 {} ({}) 试图访问 {} 页面", user.account_id, user.role, role);
        return HttpResponse::Forbidden().json(ApiResponse {
            success: false,
            message: "无权访问该页面".to_string(),
            data: None,
        });
    }

    HttpResponse::Ok().json(Page {
        component: role.dashboard_component(),
        url: role.dashboard_path().to_string(),
        props: json!({
            "user": {
                "id": user.account_id,
                "name": user.name,
                "role": user.role,
            }
        }),
    })
}
