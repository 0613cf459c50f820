// SafeDocs Session Client - library root

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod request;

pub use auth::{
    AuthService, CredentialPair, EndReason, MemoryTokenStore, SessionEvent, SessionManager,
    SqliteTokenStore, TokenStore, UserInfo,
};
pub use cache::FolderCache;
pub use error::{ApiError, Result};
pub use http_client::SessionClient;
pub use request::{ApiRequest, FilePart};
