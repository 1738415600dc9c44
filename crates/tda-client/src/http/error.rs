/*
[INPUT]:  Error sources (HTTP, status codes, serialization, TLS, listener, WebSocket)
[OUTPUT]: Structured error type shared by every operation in the crate
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the TD Ameritrade client
#[derive(Error, Debug)]
pub enum TdaError {
    /// Transport-level HTTP failure (DNS, refused connection, TLS)
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Non-2xx HTTP response
    #[error("{status}: {reason}")]
    Status { status: u16, reason: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS key or certificate could not be loaded
    #[error("TLS error: {0}")]
    Tls(String),

    /// Callback listener could not bind its address
    #[error("Failed to bind callback listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timed out waiting for the peer
    #[error("Timed out after {duration}s")]
    Timeout { duration: u64 },

    /// Streaming session is closed
    #[error("Streaming session is closed")]
    SessionClosed,

    /// Login page could not be opened
    #[error("Failed to open login page: {0}")]
    Browser(String),
}

impl TdaError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TdaError::Http(_) | TdaError::Timeout { .. } | TdaError::WebSocket(_) => true,
            TdaError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if the error happened before the authorization flow could start
    pub fn is_startup_error(&self) -> bool {
        matches!(self, TdaError::Tls(_) | TdaError::Bind { .. })
    }

    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TdaError::Status { status, .. } => Some(*status),
            TdaError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Create a status error from a non-2xx response status.
    ///
    /// The reason is the canonical phrase for the code (`"Unknown"` for
    /// unregistered codes); reqwest does not expose the server's own phrase.
    pub fn from_status(status: StatusCode) -> Self {
        TdaError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, TdaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = TdaError::from_status(StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "404: Not Found");
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_status_error_uses_canonical_reason() {
        let teapot = TdaError::from_status(StatusCode::IM_A_TEAPOT);
        assert_eq!(teapot.to_string(), "418: I'm a teapot");

        let custom = TdaError::from_status(StatusCode::from_u16(599).unwrap());
        assert_eq!(custom.to_string(), "599: Unknown");
        assert!(custom.is_retryable());
    }

    #[test]
    fn test_error_retryable() {
        assert!(TdaError::Timeout { duration: 30 }.is_retryable());
        assert!(TdaError::from_status(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(!TdaError::from_status(StatusCode::UNAUTHORIZED).is_retryable());
        assert!(!TdaError::SessionClosed.is_retryable());
    }

    #[test]
    fn test_startup_errors() {
        let bind = TdaError::Bind {
            addr: "127.0.0.1:8443".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(bind.is_startup_error());
        assert!(TdaError::Tls("bad key".to_string()).is_startup_error());
        assert!(!TdaError::Config("missing".to_string()).is_startup_error());
    }
}
