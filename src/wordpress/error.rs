//! Error types for WordPress REST calls.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while talking to a WordPress REST API.
#[derive(Debug, Error)]
pub enum WpError {
    /// The request never produced a response (DNS, TLS, timeout, connection reset).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}{}", status_hint(.status))]
    Status { status: u16, message: String },

    /// The body was not the JSON we expected.
    #[error("invalid JSON from API: {0}")]
    Decode(#[from] serde_json::Error),

    /// The JSON parsed but had the wrong shape (e.g. an object where a list was expected).
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The configured API root is not a usable URL.
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl WpError {
    /// Build a [`WpError::Status`] from a response body.
    ///
    /// WordPress errors look like `{"code": "...", "message": "..."}`; the
    /// message (or failing that the code) is kept. Anything else is cut to
    /// its first 200 characters.
    pub fn status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("code"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.chars().take(200).collect());
        WpError::Status { status, message }
    }

    /// HTTP status code, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WpError::Status { status, .. } => Some(*status),
            WpError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WpError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            WpError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

fn status_hint(status: &u16) -> &'static str {
    match *status {
        401 => " (check the username and application password)",
        403 => " (the user lacks the required permissions)",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_wordpress_message() {
        let err = WpError::status(
            401,
            r#"{"code":"rest_not_logged_in","message":"Vous n'êtes actuellement pas connecté.","data":{"status":401}}"#,
        );
        assert_eq!(
            err.to_string(),
            "HTTP 401: Vous n'êtes actuellement pas connecté. (check the username and application password)"
        );
        assert_eq!(err.status_code(), Some(401));
    }

    #[test]
    fn test_status_falls_back_to_code_then_body() {
        let err = WpError::status(404, r#"{"code":"rest_no_route"}"#);
        assert_eq!(err.to_string(), "HTTP 404: rest_no_route");
        assert!(err.is_not_found());

        let html = "<html>".to_string() + &"x".repeat(500);
        match WpError::status(500, &html) {
            WpError::Status { message, .. } => assert_eq!(message.chars().count(), 200),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(WpError::status(503, "").is_transient());
        assert!(WpError::status(429, "").is_transient());
        assert!(!WpError::status(403, "").is_transient());
        assert!(!WpError::UnexpectedShape("x".into()).is_transient());
    }
}
