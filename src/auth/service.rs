// Auth Service calls: sign-in, token refresh, logout
//
// These go out on a bare client without the session's bearer handling,
// so a failing refresh can never trigger another refresh.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::types::{CredentialPair, GoogleLoginRequest, RefreshTokenRequest};
use crate::error::{ApiError, Result};

/// Client for the `/auth/*` endpoints
#[derive(Clone)]
pub struct AuthService {
    client: Client,
    base_url: String,
}

impl AuthService {
    /// Create a new Auth Service client
    pub fn new(base_url: &str, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing HTTP client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange a Google ID token for a credential pair
    pub async fn login_with_google(&self, id_token: &str) -> Result<CredentialPair> {
        tracing::info!("Signing in with Google ID token...");

        let pair = self
            .post_for_pair("/auth/google", &GoogleLoginRequest { id_token })
            .await?;

        tracing::info!("Sign-in successful");
        Ok(pair)
    }

    /// Rotate the credential pair using the refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair> {
        tracing::debug!("Refreshing access token...");

        let pair = self
            .post_for_pair("/auth/refresh", &RefreshTokenRequest { refresh_token })
            .await?;

        tracing::info!("Access token refreshed");
        Ok(pair)
    }

    /// Revoke the refresh token on the server
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let url = format!("{}/auth/logout", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), &error_text));
        }

        Ok(())
    }

    async fn post_for_pair<B: Serialize>(&self, path: &str, body: &B) -> Result<CredentialPair> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                url = %url,
                "Auth Service rejected request"
            );
            return Err(ApiError::from_status(status.as_u16(), &error_text));
        }

        let text = response.text().await?;
        let pair: CredentialPair = serde_json::from_str(&text)?;

        if pair.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Auth response does not contain accessToken".to_string(),
            ));
        }
        if pair.refresh_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Auth response does not contain refreshToken".to_string(),
            ));
        }

        Ok(pair)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("base_url", &self.base_url)
            .finish()
    }
}
