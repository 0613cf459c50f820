use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::api::{DocumentsService, FilesService, FoldersService, SharesService};
use crate::auth::SessionManager;
use crate::error::{ApiError, Result};
use crate::request::ApiRequest;

/// Per-request progress through the 401 handling path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// First attempt, refresh still allowed
    Initial,
    /// Replayed once after a refresh
    Retried,
    /// A second 401 arrived; no more refreshes
    Terminal,
}

/// What to do with a 401
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RefreshAndReplay,
    GiveUp,
}

impl RetryState {
    /// Advance on a 401 response
    pub fn on_unauthorized(self) -> (RetryState, RetryDecision) {
        match self {
            RetryState::Initial => (RetryState::Retried, RetryDecision::RefreshAndReplay),
            RetryState::Retried | RetryState::Terminal => {
                (RetryState::Terminal, RetryDecision::GiveUp)
            }
        }
    }
}

/// Authenticated HTTP client for the SafeDocs API
///
/// Attaches the session's bearer token to every request and recovers from
/// one expired access token per request by refreshing and replaying.
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Clone)]
pub struct SessionClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API base URL without trailing slash
    base_url: Arc<str>,

    /// Session state shared with the rest of the application
    session: Arc<SessionManager>,
}

impl SessionClient {
    /// Create a new session client
    pub fn new(
        base_url: &str,
        session: Arc<SessionManager>,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(Self::with_client(client, base_url, session))
    }

    /// Reuse an existing HTTP client
    pub fn with_client(client: Client, base_url: &str, session: Arc<SessionManager>) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn documents(&self) -> DocumentsService {
        DocumentsService::new(self.clone())
    }

    pub fn folders(&self) -> FoldersService {
        FoldersService::new(self.clone())
    }

    pub fn shares(&self) -> SharesService {
        SharesService::new(self.clone())
    }

    pub fn files(&self) -> FilesService {
        FilesService::new(self.clone())
    }

    /// Send a request with session handling
    /// - attaches `Authorization: Bearer <access token>` when logged in
    /// - 401: refreshes once and replays with the new token
    /// - anything else non-2xx: `ApiError::Http`
    pub async fn send(&self, request: ApiRequest) -> Result<Response> {
        let mut state = RetryState::Initial;
        let mut access_token = self.session.access_token().await;

        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            authenticated = access_token.is_some(),
            "Sending HTTP request"
        );

        loop {
            let response = self.execute(&request, access_token.as_deref()).await?;
            let status = response.status();

            if status.is_success() {
                tracing::debug!(status = %status, "Request successful");
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED {
                let (next, decision) = state.on_unauthorized();
                state = next;

                match decision {
                    RetryDecision::RefreshAndReplay => {
                        tracing::warn!(
                            path = %request.path(),
                            "Received 401, refreshing session and replaying"
                        );

                        let pair = self
                            .session
                            .refresh_after_unauthorized(access_token.as_deref())
                            .await?;

                        // Replay with exactly the token this refresh produced
                        access_token = Some(pair.access_token);
                        continue;
                    }
                    RetryDecision::GiveUp => {
                        tracing::error!(
                            path = %request.path(),
                            "Received 401 after session refresh, giving up"
                        );
                        return Err(ApiError::AuthRequired(
                            "request rejected after session refresh".to_string(),
                        ));
                    }
                }
            }

            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                path = %request.path(),
                "HTTP request failed with error response"
            );
            return Err(ApiError::from_status(status.as_u16(), &error_text));
        }
    }

    /// Send and decode a JSON body
    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send and decode a JSON body; 204 No Content yields `T::default()`
    pub async fn json_or_default<T: DeserializeOwned + Default>(
        &self,
        request: ApiRequest,
    ) -> Result<T> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(T::default());
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Send and discard the body
    pub async fn send_empty(&self, request: ApiRequest) -> Result<()> {
        self.send(request).await?;
        Ok(())
    }

    /// Send and collect the raw body
    pub async fn bytes(&self, request: ApiRequest) -> Result<Bytes> {
        let response = self.send(request).await?;
        Ok(response.bytes().await?)
    }

    /// Send and stream the body into a file at `path`, returning the byte count
    pub async fn save_to(&self, request: ApiRequest, path: &Path) -> Result<u64> {
        let response = self.send(request).await?;

        let mut file = tokio::fs::File::create(path).await.map_err(|e| {
            ApiError::InvalidRequest(format!("cannot create {}: {}", path.display(), e))
        })?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(|e| {
                ApiError::InvalidRequest(format!("cannot write {}: {}", path.display(), e))
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| {
            ApiError::InvalidRequest(format!("cannot write {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), bytes = written, "Response body saved");
        Ok(written)
    }

    async fn execute(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<Response> {
        let builder = request.build(&self.client, &self.base_url, access_token)?;

        match builder.send().await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!(
                    error_kind = error_kind(&e),
                    error = %e,
                    path = %request.path(),
                    "HTTP request error"
                );
                Err(ApiError::Transport(e))
            }
        }
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Categorize a transport error for logs
fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_retry_state_transitions() {
        let (state, decision) = RetryState::Initial.on_unauthorized();
        assert_eq!(state, RetryState::Retried);
        assert_eq!(decision, RetryDecision::RefreshAndReplay);

        let (state, decision) = state.on_unauthorized();
        assert_eq!(state, RetryState::Terminal);
        assert_eq!(decision, RetryDecision::GiveUp);

        let (state, decision) = state.on_unauthorized();
        assert_eq!(state, RetryState::Terminal);
        assert_eq!(decision, RetryDecision::GiveUp);
    }

    proptest! {
        #[test]
        fn prop_at_most_one_refresh_per_request(unauthorized in 0usize..32) {
            let mut state = RetryState::Initial;
            let mut refreshes = 0;
            for _ in 0..unauthorized {
                let (next, decision) = state.on_unauthorized();
                state = next;
                if decision == RetryDecision::RefreshAndReplay {
                    refreshes += 1;
                }
            }
            prop_assert_eq!(refreshes, unauthorized.min(1));
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let auth = crate::auth::AuthService::new("http://api.local/", 5).unwrap();
        let session = Arc::new(SessionManager::new(
            auth,
            Arc::new(crate::auth::MemoryTokenStore::new()),
        ));
        let client = SessionClient::new("http://api.local/", session, 5, 5).unwrap();

        assert_eq!(client.base_url(), "http://api.local");
        assert_eq!(client.url("/files/d1/view"), "http://api.local/files/d1/view");
    }
}
