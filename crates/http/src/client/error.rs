//! Client error types

use reqwest::StatusCode;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Final response was not successful
    #[error("HTTP {status}{}", body_suffix(.body))]
    Status { status: StatusCode, body: String },

    /// No refresh token is stored
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Refresh endpoint answered with a non-success status
    #[error("Refresh endpoint rejected the request with {status}")]
    RefreshRejected { status: StatusCode },

    /// Refresh endpoint answered without a usable access token
    #[error("Refresh response did not contain an access token")]
    MalformedRefreshResponse,

    /// Server answered successfully but without the expected body
    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request target could not be turned into a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request rejected before it was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl ClientError {
    /// Create error from a final HTTP status and its body text
    pub fn from_status(status: StatusCode, body: String) -> Self {
        Self::Status { status, body }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::RefreshRejected { status } => Some(*status),
            Self::Request(e) => e.status(),
            _ => None,
        }
    }

    /// Whether the caller should send the user back through login
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// Whether the error came out of the token refresh flow
    pub fn is_refresh_failure(&self) -> bool {
        matches!(
            self,
            Self::NoRefreshToken | Self::RefreshRejected { .. } | Self::MalformedRefreshResponse
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_includes_code_reason_and_body() {
        let err = ClientError::from_status(StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#.into());
        assert_eq!(err.to_string(), r#"HTTP 404 Not Found: {"detail":"Not found."}"#);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn status_message_without_body() {
        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, String::new());
        assert_eq!(err.to_string(), "HTTP 401 Unauthorized");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn refresh_failures_are_classified() {
        assert!(ClientError::NoRefreshToken.is_refresh_failure());
        assert!(ClientError::MalformedRefreshResponse.is_refresh_failure());
        assert!(
            ClientError::RefreshRejected {
                status: StatusCode::BAD_REQUEST
            }
            .is_refresh_failure()
        );
        assert!(!ClientError::Configuration("x".into()).is_refresh_failure());
    }
}
