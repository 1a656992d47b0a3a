//! Backend communication errors.

use thiserror::Error;

/// Result type for backend calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the report backend.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced an HTTP response (DNS, refused, reset).
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The request did not complete in time.
    #[error("request to {endpoint} timed out after {seconds} seconds")]
    Timeout { endpoint: String, seconds: u64 },

    /// The server answered with a non-success HTTP status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The server answered `{success: false, error}`.
    #[error("{endpoint} reported an error: {message}")]
    Remote { endpoint: String, message: String },

    /// A request body could not be serialized.
    #[error("failed to serialize request for {endpoint}: {source}")]
    SerializeFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// A response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {message}")]
    DecodeFailed { endpoint: String, message: String },

    /// The base URL or an endpoint path does not form a valid URL.
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    /// Client settings could not be turned into a working client.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// The requested record does not exist on the backend.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}

impl ClientError {
    pub fn remote(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Classify a reqwest failure for the given endpoint.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
                seconds: timeout_secs,
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::DecodeFailed {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::transport(endpoint, err.to_string())
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
