use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{http::header, web, HttpRequest, HttpResponse, Responder};
use serde::Serialize;
use serde_json::Value;

use crate::auth::{resolve_session, AuthMiddleware, Session, SESSION_COOKIE};

mod dashboard;
mod login;
mod logout;

// 通用响应结构体
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

/// 交给前端单页应用渲染的页面对象
#[derive(Debug, Serialize)]
pub struct Page {
    pub component: &'static str,
    pub url: String,
    pub props: Value,
}

pub fn configure(cfg: &mut web::ServiceConfig, guard: AuthMiddleware) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::resource("/login")
                .route(web::get().to(login::show_login))
                .route(web::post().to(login::login)),
        )
        .service(
            web::resource("/logout")
                .route(web::post().to(logout::logout))
                .wrap(guard.clone()),
        )
        .service(
            web::resource("/dashboard")
                .route(web::get().to(dashboard::dashboard))
                .wrap(guard.clone()),
        )
        .service(
            web::resource("/{role}/dashboard")
                .route(web::get().to(dashboard::role_dashboard))
                .wrap(guard),
        );
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse {
        success: true,
        message: "ok".to_string(),
        data: None,
    })
}

/// 当前请求 cookie 对应的有效会话
pub fn current_session(req: &HttpRequest, data: &crate::AppState) -> Option<Session> {
    req.cookie(SESSION_COOKIE)
        .and_then(|c| resolve_session(c.value(), &data.signer, &data.session_manager))
}

/// 用于限流的客户端来源
pub fn client_origin(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn session_cookie(token: String, session: &Session, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .finish();
    // 勾选“记住我”时才写持久 cookie
    if session.remember {
        let secs = (session.expires_at - session.created_at).num_seconds();
        cookie.set_max_age(time::Duration::seconds(secs));
    }
    cookie
}

pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .finish();
    cookie.make_removal();
    cookie
}

pub fn see_other(location: &str) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location.to_string()));
    builder
}
