use crate::auth::types::{Account, Role};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SESSION_ID_LEN: usize = 40;
/// 访客会话只用于承载登录表单，寿命不超过 30 分钟
const GUEST_LIFETIME: Duration = Duration::from_secs(30 * 60);
/// 同时存在的访客会话上限
const MAX_GUEST_SESSIONS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub account_id: i64,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub user: Option<SessionUser>,
    pub remember: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// 服务端会话表。登录成功必须换发新的会话 id
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    lifetime: Duration,
    remember_lifetime: Duration,
    guest_limit: usize,
}

impl SessionManager {
    pub fn new(lifetime: Duration, remember_lifetime: Duration) -> Self {
        info!("初始化会话管理器");
        Self {
            sessions: Mutex::new(HashMap::new()),
            lifetime,
            remember_lifetime,
            guest_limit: MAX_GUEST_SESSIONS,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn to_chrono(lifetime: Duration) -> chrono::Duration {
        chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::days(30))
    }

    pub fn lifetime(&self, remember: bool) -> Duration {
        if remember {
            self.remember_lifetime
        } else {
            self.lifetime
        }
    }

    fn insert_fresh(
        sessions: &mut HashMap<String, Session>,
        user: Option<SessionUser>,
        remember: bool,
        lifetime: Duration,
    ) -> Session {
        let now = Utc::now();
        let id = loop {
            let candidate = generate_session_id();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = Session {
            id: id.clone(),
            user,
            remember,
            created_at: now,
            expires_at: now + Self::to_chrono(lifetime),
        };
        sessions.insert(id, session.clone());
        session
    }

    /// 为未登录访客创建会话
    pub fn start_guest(&self) -> Session {
        let mut sessions = self.lock();
        if sessions.len() >= self.guest_limit {
            evict_guests(&mut sessions, self.guest_limit);
        }
        let lifetime = self.lifetime.min(GUEST_LIFETIME);
        let session = Self::insert_fresh(&mut sessions, None, false, lifetime);
        debug!("创建访客会话");
        session
    }

    /// 登录成功：作废旧会话并换发新的会话 id
    pub fn establish(&self, previous: Option<&str>, account: &Account, remember: bool) -> Session {
        if let Some(previous) = previous {
            if self.lock().remove(previous).is_some() {
                debug!("登录前的会话已作废");
            }
        }

        let session = Self::insert_fresh(
            &mut self.lock(),
            Some(SessionUser {
                account_id: account.id,
                name: account.name.clone(),
                role: account.role,
            }),
            remember,
            self.lifetime(remember),
        );
        info!("账号 {} 建立新会话", account.id);
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let session = self.lock().get(id).cloned()?;
        if session.is_expired(now) {
            warn!("会话已过期");
            self.revoke(id);
            return None;
        }
        Some(session)
    }

    pub fn revoke(&self, id: &str) {
        if self.lock().remove(id).is_some() {
            debug!("会话已作废");
        }
    }

    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        let mut sessions = self.lock();
        let before_count = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        info!("清理了 {} 个过期的会话", before_count - sessions.len());
    }
}

/// 先清掉过期会话，访客数仍达到上限时淘汰最早创建的访客会话
fn evict_guests(sessions: &mut HashMap<String, Session>, limit: usize) {
    let now = Utc::now();
    sessions.retain(|_, s| !s.is_expired(now));

    let mut guests: Vec<(DateTime<Utc>, String)> = sessions
        .values()
        .filter(|s| s.user.is_none())
        .map(|s| (s.created_at, s.id.clone()))
        .collect();
    if guests.len() < limit {
        return;
    }

    guests.sort();
    let excess = guests.len() + 1 - limit;
    for (_, id) in guests.into_iter().take(excess) {
        sessions.remove(&id);
    }
    warn!("访客会话达到上限 {}，淘汰了 {} 个最早的访客会话", limit, excess);
}

fn generate_session_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}
