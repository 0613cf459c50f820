use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::claims;
use super::service::AuthService;
use super::store::TokenStore;
use super::types::{CredentialPair, EndReason, SessionEvent, UserInfo};
use crate::error::{ApiError, Result};

/// Capacity of the session event channel
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Current credentials tagged with a generation
///
/// The generation changes on every login, refresh and logout, so a refresh
/// that finishes after the session was replaced can tell its result is stale
#[derive(Default)]
struct SessionState {
    pair: Option<CredentialPair>,
    generation: u64,
}

impl SessionState {
    fn replace(&mut self, pair: Option<CredentialPair>) -> Option<CredentialPair> {
        self.generation = self.generation.wrapping_add(1);
        std::mem::replace(&mut self.pair, pair)
    }
}

/// Session manager
/// Owns the current credential pair, its persisted refresh token and the
/// subscriber channel. One instance per running client, shared via `Arc`.
pub struct SessionManager {
    /// Current credentials, `None` when logged out
    state: RwLock<SessionState>,

    /// Durable refresh token storage
    store: Arc<dyn TokenStore>,

    /// Auth Service client used for login, refresh and logout
    auth: AuthService,

    /// Session event broadcaster
    events: broadcast::Sender<SessionEvent>,

    /// Serializes refresh attempts so concurrent 401s share one refresh
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    /// Create a logged-out session manager
    pub fn new(auth: AuthService, store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            state: RwLock::new(SessionState::default()),
            store,
            auth,
            events,
            refresh_gate: Mutex::new(()),
        }
    }

    /// Subscribe to refresh and session-ended notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current credentials
    pub async fn credentials(&self) -> Option<CredentialPair> {
        self.state.read().await.pair.clone()
    }

    /// Current access token, if logged in
    pub async fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .pair
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.pair.is_some()
    }

    /// Identity decoded from the current access token
    pub async fn user(&self) -> Option<UserInfo> {
        let token = self.access_token().await?;
        match claims::decode_user(&token) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::error!("Failed to decode token: {:#}", e);
                None
            }
        }
    }

    /// Replace the session with an externally obtained pair
    ///
    /// The refresh token is persisted first; on a store error the previous
    /// session stays in place.
    pub async fn set_credentials(&self, pair: CredentialPair) -> Result<()> {
        let mut state = self.state.write().await;
        self.store
            .save(&pair.refresh_token)
            .map_err(ApiError::Storage)?;
        state.replace(Some(pair));
        Ok(())
    }

    /// Drop the session locally; does not contact the Auth Service
    pub async fn clear_credentials(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.write().await;
            let previous = state.replace(None);
            self.store.clear().map_err(ApiError::Storage)?;
            previous
        };

        if previous.is_some() {
            tracing::info!("Session cleared");
            self.broadcast(SessionEvent::Ended(EndReason::LoggedOut));
        }
        Ok(())
    }

    /// Interactive sign-in with a Google ID token
    pub async fn login_with_google(&self, id_token: &str) -> Result<CredentialPair> {
        let pair = self.auth.login_with_google(id_token).await?;
        self.set_credentials(pair.clone()).await?;
        Ok(pair)
    }

    /// Best-effort remote logout followed by a local clear
    ///
    /// Revokes the held refresh token, or the persisted one when no session
    /// was restored. Remote and store read failures are logged and ignored.
    pub async fn logout(&self) -> Result<()> {
        let held = self
            .state
            .read()
            .await
            .pair
            .as_ref()
            .map(|pair| pair.refresh_token.clone());

        let refresh_token = match held {
            Some(token) => Some(token),
            None => self.store.load().unwrap_or_else(|e| {
                tracing::warn!("Failed to read persisted refresh token: {:#}", e);
                None
            }),
        };

        if let Some(refresh_token) = refresh_token {
            if let Err(e) = self.auth.logout(&refresh_token).await {
                tracing::warn!("Logout request failed, clearing local session anyway: {}", e);
            }
        }

        self.clear_credentials().await
    }

    /// Restore a session from the persisted refresh token
    /// Returns `Ok(false)` when nothing is stored or the token was rejected.
    pub async fn restore(&self) -> Result<bool> {
        let stored = self.store.load().map_err(ApiError::Storage)?;
        let Some(refresh_token) = stored else {
            tracing::debug!("No persisted refresh token");
            return Ok(false);
        };

        tracing::info!("Restoring session from persisted refresh token...");

        match self.auth.refresh(&refresh_token).await {
            Ok(pair) => {
                self.set_credentials(pair).await?;
                tracing::info!("Session restored");
                Ok(true)
            }
            Err(e @ ApiError::Transport(_)) => Err(e),
            Err(e) => {
                tracing::warn!("Persisted refresh token rejected: {}", e);
                let mut state = self.state.write().await;
                state.replace(None);
                self.store.clear().map_err(ApiError::Storage)?;
                Ok(false)
            }
        }
    }

    /// Obtain fresh credentials after a request carrying `stale_access`
    /// was answered with 401.
    ///
    /// Refreshes are serialized: if another request already rotated the
    /// tokens while this one waited, the rotated pair is returned without a
    /// second Auth Service call. If a previous refresh ended the session,
    /// fails without calling the Auth Service. A refresh whose session was
    /// replaced or cleared while it was in flight is discarded.
    pub async fn refresh_after_unauthorized(
        &self,
        stale_access: Option<&str>,
    ) -> Result<CredentialPair> {
        let _gate = self.refresh_gate.lock().await;

        let (refresh_token, generation) = {
            let state = self.state.read().await;
            match state.pair.as_ref() {
                None => {
                    return Err(ApiError::AuthRequired(
                        "no refresh token available".to_string(),
                    ));
                }
                Some(pair) if stale_access != Some(pair.access_token.as_str()) => {
                    tracing::debug!("Credentials already rotated by a concurrent refresh");
                    return Ok(pair.clone());
                }
                Some(pair) => (pair.refresh_token.clone(), state.generation),
            }
        };

        let outcome = self.auth.refresh(&refresh_token).await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::warn!("Session changed during token refresh, discarding refresh result");
            return state.pair.clone().ok_or_else(|| {
                ApiError::AuthRequired("session ended during refresh".to_string())
            });
        }

        match outcome {
            Ok(pair) => {
                state.replace(Some(pair.clone()));
                if let Err(e) = self.store.save(&pair.refresh_token) {
                    tracing::error!("Failed to persist rotated refresh token: {:#}", e);
                }
                drop(state);

                self.broadcast(SessionEvent::Refreshed(pair.clone()));
                Ok(pair)
            }
            Err(e) => {
                tracing::error!("Token refresh failed, ending session: {}", e);

                state.replace(None);
                if let Err(e) = self.store.clear() {
                    tracing::error!("Failed to erase persisted refresh token: {:#}", e);
                }
                drop(state);

                self.broadcast(SessionEvent::Ended(EndReason::RefreshFailed));
                Err(ApiError::AuthRequired(format!("session refresh failed: {}", e)))
            }
        }
    }

    fn broadcast(&self, event: SessionEvent) {
        // No subscribers is fine
        if self.events.send(event).is_err() {
            tracing::debug!("No session event subscribers");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("auth", &self.auth)
            .field("credentials", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryTokenStore;

    fn manager_with_store(url: &str, store: Arc<MemoryTokenStore>) -> SessionManager {
        let auth = AuthService::new(url, 5).unwrap();
        SessionManager::new(auth, store)
    }

    #[tokio::test]
    async fn test_set_credentials_persists_refresh_token() {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = manager_with_store("http://127.0.0.1:9", store.clone());

        manager
            .set_credentials(CredentialPair::new("A1", "R1"))
            .await
            .unwrap();

        assert_eq!(manager.access_token().await.as_deref(), Some("A1"));
        assert_eq!(store.load().unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_clear_credentials_twice() {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = manager_with_store("http://127.0.0.1:9", store.clone());
        let mut events = manager.subscribe();

        manager
            .set_credentials(CredentialPair::new("A1", "R1"))
            .await
            .unwrap();

        manager.clear_credentials().await.unwrap();
        assert!(!manager.is_authenticated().await);
        assert_eq!(store.load().unwrap(), None);

        manager.clear_credentials().await.unwrap();
        assert!(!manager.is_authenticated().await);
        assert_eq!(store.load().unwrap(), None);

        // Only the first clear ended a live session
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Ended(EndReason::LoggedOut)
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refresh_on_empty_session_needs_no_network() {
        // Unroutable base URL: any network call would fail with Transport
        let manager =
            manager_with_store("http://127.0.0.1:9", Arc::new(MemoryTokenStore::new()));

        let err = manager
            .refresh_after_unauthorized(Some("A1"))
            .await
            .unwrap_err();
        assert!(err.is_auth_required());
    }

    #[tokio::test]
    async fn test_refresh_reuses_already_rotated_pair() {
        let manager =
            manager_with_store("http://127.0.0.1:9", Arc::new(MemoryTokenStore::new()));
        manager
            .set_credentials(CredentialPair::new("A2", "R2"))
            .await
            .unwrap();

        let pair = manager
            .refresh_after_unauthorized(Some("A1"))
            .await
            .unwrap();
        assert_eq!(pair, CredentialPair::new("A2", "R2"));
    }

    #[tokio::test]
    async fn test_restore_without_stored_token() {
        let manager =
            manager_with_store("http://127.0.0.1:9", Arc::new(MemoryTokenStore::new()));
        assert!(!manager.restore().await.unwrap());
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_erases_it() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .create_async()
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("R-old"));
        let manager = manager_with_store(&server.url(), store.clone());

        assert!(!manager.restore().await.unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_transport_error_keeps_token() {
        let store = Arc::new(MemoryTokenStore::with_token("R-old"));
        let manager = manager_with_store("http://127.0.0.1:9", store.clone());

        let err = manager.restore().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(store.load().unwrap().as_deref(), Some("R-old"));
    }

    /// Store that rejects writes
    struct ReadOnlyStore;

    impl TokenStore for ReadOnlyStore {
        fn load(&self) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn save(&self, _refresh_token: &str) -> anyhow::Result<()> {
            anyhow::bail!("database is read-only")
        }

        fn clear(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_set_credentials_store_failure_keeps_previous_session() {
        let manager = SessionManager::new(
            AuthService::new("http://127.0.0.1:9", 5).unwrap(),
            Arc::new(ReadOnlyStore),
        );

        let err = manager
            .set_credentials(CredentialPair::new("A1", "R1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Storage(_)));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_offline_clears_persisted_token() {
        // Nothing restored, Auth Service unreachable
        let store = Arc::new(MemoryTokenStore::with_token("R1"));
        let manager = manager_with_store("http://127.0.0.1:9", store.clone());

        manager.logout().await.unwrap();

        assert_eq!(store.load().unwrap(), None);
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_revokes_persisted_token_without_refresh() {
        let mut server = mockito::Server::new_async().await;
        let revoke = server
            .mock("POST", "/auth/logout")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({ "refreshToken": "R1" }),
            ))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("R1"));
        let manager = manager_with_store(&server.url(), store.clone());

        manager.logout().await.unwrap();

        revoke.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_user_from_opaque_token_is_none() {
        let manager =
            manager_with_store("http://127.0.0.1:9", Arc::new(MemoryTokenStore::new()));
        manager
            .set_credentials(CredentialPair::new("opaque", "R1"))
            .await
            .unwrap();
        assert!(manager.user().await.is_none());
    }
}
