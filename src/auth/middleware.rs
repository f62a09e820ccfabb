use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};
use std::sync::Arc;

use crate::auth::{Session, SessionManager, TokenSigner};

/// 会话 cookie 名称
pub const SESSION_COOKIE: &str = "school_session";

/// 校验 cookie 中的 token，并确认服务端会话仍然有效且与 token 一致
pub fn resolve_session(token: &str, signer: &TokenSigner, sessions: &SessionManager) -> Option<Session> {
    let claims = match signer.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("会话 token 验证失败: {}", e);
            return None;
        }
    };

    let session = sessions.get(&claims.sid)?;
    let owner = session.user.as_ref().map(|u| u.account_id);
    if owner != claims.account_id() {
        warn!("会话 token 与服务端会话不一致");
        return None;
    }
    Some(session)
}

/// 要求请求携带已登录的会话，成功时把 `Session` 放入请求扩展
#[derive(Clone)]
pub struct AuthMiddleware {
    signer: TokenSigner,
    sessions: Arc<SessionManager>,
}

impl AuthMiddleware {
    pub fn new(signer: TokenSigner, sessions: Arc<SessionManager>) -> Self {
        Self { signer, sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Arc::new(service),
            signer: self.signer.clone(),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    signer: TokenSigner,
    sessions: Arc<SessionManager>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let session = req
            .cookie(SESSION_COOKIE)
            .and_then(|c| resolve_session(c.value(), &self.signer, &self.sessions));

        Box::pin(async move {
            let session = match session {
                Some(session) if session.user.is_some() => session,
                Some(_) => {
                    debug!("访客会话访问受保护页面");
                    return Err(ErrorUnauthorized("请先登录"));
                }
                None => {
                    warn!("未提供有效的会话");
                    return Err(ErrorUnauthorized("请先登录"));
                }
            };

            req.extensions_mut().insert(session);
            service.call(req).await
        })
    }
}
