mod auth;
mod config;
mod db;
mod handlers;
mod logger;
mod throttle;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use auth::{AuthManager, AuthMiddleware, CredentialResolver, SessionManager, TokenSigner};
use config::{Config, ThrottleBackend};
use db::PgAccountStore;
use log::{error, info};
use throttle::{AttemptThrottle, CounterStore, MemoryCounterStore, PgCounterStore};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

// 应用状态
pub struct AppState {
    auth_manager: AuthManager,
    session_manager: Arc<SessionManager>,
    signer: TokenSigner,
    cookie_secure: bool,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 加载 .env
    dotenv().ok();

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    // 初始化日志系统
    if let Err(e) = logger::Logger::init(config.log_file.as_deref(), config.log_level) {
        eprintln!("初始化日志系统失败: {}", e);
    }

    info!("应用程序启动");

    // 连接数据库
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("数据库连接错误: {}", e)))?;

    // 初始化数据库
    db::initialize_db(pool.clone())
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("数据库初始化错误: {}", e)))?;

    let counter_store: Arc<dyn CounterStore> = match config.throttle_backend {
        ThrottleBackend::Postgres => Arc::new(PgCounterStore::new(pool.clone())),
        ThrottleBackend::Memory => Arc::new(MemoryCounterStore::new()),
    };
    info!("登录限流计数存储: {:?}", config.throttle_backend);

    let throttle = AttemptThrottle::new(counter_store, config.throttle_window);
    let resolver = CredentialResolver::new(Arc::new(PgAccountStore::new(pool)));
    let session_manager = Arc::new(SessionManager::new(
        config.session_lifetime,
        config.remember_lifetime,
    ));
    let signer = TokenSigner::new(&config.jwt_secret);

    let app_state = web::Data::new(AppState {
        auth_manager: AuthManager::new(resolver, throttle.clone()),
        session_manager: session_manager.clone(),
        signer: signer.clone(),
        cookie_secure: config.cookie_secure,
    });

    // 定期清理过期的会话与限流计数
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            session_manager.cleanup_expired();
            throttle.cleanup_expired().await;
        }
    });

    let guard = AuthMiddleware::new(signer, app_state.session_manager.clone());
    let cors_origin = config.cors_allowed_origin.clone();

    info!("服务器启动在 http://{}", config.bind_addr);

    HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
                .max_age(3600),
            None => Cors::default(),
        };
        let guard = guard.clone();

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .configure(|cfg| handlers::configure(cfg, guard))
    })
    .bind(&config.bind_addr)
    .map_err(|e| {
        error!("绑定地址 {} 失败: {}", config.bind_addr, e);
        e
    })?
    .run()
    .await
}
