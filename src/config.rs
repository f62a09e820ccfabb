use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("缺少环境变量 {0}")]
    Missing(&'static str),

    #[error("环境变量 {name} 的值无效: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleBackend {
    Postgres,
    Memory,
}

impl FromStr for ThrottleBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(ThrottleBackend::Postgres),
            "memory" => Ok(ThrottleBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub session_lifetime: Duration,
    pub remember_lifetime: Duration,
    pub throttle_window: Duration,
    pub throttle_backend: ThrottleBackend,
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
    pub cors_allowed_origin: Option<String>,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            session_lifetime: Duration::from_secs(
                60 * parse_or(get("SESSION_LIFETIME_MINUTES"), "SESSION_LIFETIME_MINUTES", 120u64)?,
            ),
            remember_lifetime: Duration::from_secs(
                86400 * parse_or(get("REMEMBER_LIFETIME_DAYS"), "REMEMBER_LIFETIME_DAYS", 30u64)?,
            ),
            throttle_window: Duration::from_secs(parse_or(
                get("THROTTLE_WINDOW_SECONDS"),
                "THROTTLE_WINDOW_SECONDS",
                900u64,
            )?),
            throttle_backend: parse_or(get("THROTTLE_BACKEND"), "THROTTLE_BACKEND", ThrottleBackend::Postgres)?,
            log_file: get("LOG_FILE").map(PathBuf::from),
            log_level: parse_or(get("LOG_LEVEL"), "LOG_LEVEL", LevelFilter::Info)?,
            cors_allowed_origin: get("CORS_ALLOWED_ORIGIN"),
            cookie_secure: parse_or(get("COOKIE_SECURE"), "COOKIE_SECURE", false)?,
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
