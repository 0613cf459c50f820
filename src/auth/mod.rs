// Authentication module
// Manages the credential pair lifecycle, its persistence and notifications

mod claims;
mod manager;
mod service;
mod store;
mod types;

pub use manager::SessionManager;
pub use service::AuthService;
pub use store::{MemoryTokenStore, SqliteTokenStore, TokenStore, REFRESH_TOKEN_KEY};
pub use types::{CredentialPair, EndReason, SessionEvent, UserInfo};
