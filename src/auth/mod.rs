mod error;
mod jwt;
mod manager;
mod middleware;
mod resolver;
mod session;
mod store;
mod types;

pub use error::{AuthError, StoreError};
pub use jwt::TokenSigner;
pub use manager::{AuthManager, Credentials};
pub use middleware::{resolve_session, AuthMiddleware, SESSION_COOKIE};
pub use resolver::CredentialResolver;
pub use session::{Session, SessionManager};
pub use store::AccountStore;
pub use types::{Account, Role, StudentProfile};

#[cfg(test)]
pub use store::MockAccountStore;
