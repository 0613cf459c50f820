// Access token claim decoding (display only, no signature check)

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use super::types::UserInfo;

/// Decode the user identity carried in a JWT access token payload
pub fn decode_user(access_token: &str) -> Result<UserInfo> {
    let payload = access_token
        .split('.')
        .nth(1)
        .context("Access token is not a JWT")?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("Failed to base64-decode token payload")?;

    serde_json::from_slice(&bytes).context("Failed to parse token claims")
}
