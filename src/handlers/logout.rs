use actix_web::{web, HttpResponse};
use log::info;

use super::{removal_cookie, see_other};
use crate::auth::Session;
use crate::AppState;

pub async fn logout(session: web::ReqData<Session>, data: web::Data<AppState>) -> HttpResponse {
    data.session_manager.revoke(&session.id);
    if let Some(user) = &session.user {
        info!("账号 {} 登出", user.account_id);
    }

    see_other("/login")
        .cookie(removal_cookie(data.cookie_secure))
        .finish()
}
