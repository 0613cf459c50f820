// Error handling module
// Defines the error taxonomy surfaced by the session client

use thiserror::Error;

/// Maximum length for error response bodies kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors that can occur while talking to the SafeDocs API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network-level failure (connect, timeout, broken body)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response outside the handled 401 refresh path
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },

    /// No valid session could be established or restored
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    /// Successful response whose content breaks the API contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Response body is not the expected JSON
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request rejected before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Refresh token store failure
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
}

impl ApiError {
    /// Build an `Http` error, truncating the body to keep logs bounded
    pub fn from_status(status: u16, body: &str) -> Self {
        ApiError::Http {
            status,
            body: truncate_body(body),
        }
    }

    /// True when the caller must send the user back to interactive login
    pub fn is_auth_required(&self) -> bool {
        matches!(self, ApiError::AuthRequired(_))
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }

    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}... (truncated, {} total bytes)",
        &body[..end],
        body.len()
    )
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::AuthRequired("session refresh failed".to_string());
        assert_eq!(
            err.to_string(),
            "Authentication required: session refresh failed"
        );

        let err = ApiError::Http {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: 404 - not found");

        let err = ApiError::InvalidRequest("folderId is required".to_string());
        assert_eq!(err.to_string(), "Invalid request: folderId is required");
    }

    #[test]
    fn test_storage_error_message() {
        let err = ApiError::Storage(anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_is_auth_required() {
        assert!(ApiError::AuthRequired("x".to_string()).is_auth_required());
        assert!(!ApiError::from_status(401, "").is_auth_required());
        assert!(!ApiError::InvalidResponse("x".to_string()).is_auth_required());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(ApiError::from_status(503, "busy").status(), Some(503));
        assert_eq!(ApiError::AuthRequired("x".to_string()).status(), None);
    }

    #[test]
    fn test_short_body_kept_verbatim() {
        match ApiError::from_status(400, "bad title") {
            ApiError::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad title");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_long_body_truncated() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(500, &body);
        let message = err.to_string();
        assert!(message.contains("truncated, 2000 total bytes"));
        assert!(message.len() < 700);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 'ă' is two bytes; 499 ASCII + 'ă' straddles the cut
        let body = format!("{}ă{}", "a".repeat(499), "b".repeat(100));
        let truncated = truncate_body(&body);
        assert!(truncated.starts_with(&"a".repeat(499)));
        assert!(!truncated.contains('ă'));
    }
}
