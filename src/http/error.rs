use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while fetching a resource from a feed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or its body could not be read.
    #[error("Request to {uri} failed: {source}")]
    Request {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{uri} returned HTTP {status}")]
    Status { uri: String, status: u16 },

    /// The server rejected our credentials, or we had none to offer.
    #[error("Authentication failed for {uri}. Check the feed username and password.")]
    Unauthorized { uri: String },

    #[error("Invalid URI '{0}'")]
    InvalidUri(String),

    /// The HTTP client could not be configured (bad proxy, TLS backend, ...).
    #[error("Failed to configure HTTP client: {0}")]
    Client(String),

    #[error("Request to {0} was cancelled")]
    Cancelled(String),

    /// The body exceeded the caller's size limit. `received` is the declared
    /// length, or the byte count read when the download was abandoned.
    #[error("{uri} is larger than the {limit} byte limit ({received} bytes)")]
    TooLarge { uri: String, received: u64, limit: u64 },
}

impl TransportError {
    /// Returns true for failures that may succeed on a later attempt.
    ///
    /// Connection problems, timeouts and 5xx answers are transient; 4xx
    /// answers are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request { source, .. } => {
                !source.is_builder()
                    && (source.is_connect()
                        || source.is_timeout()
                        || source.is_request()
                        || source.is_body())
            }
            TransportError::Status { status, .. } => StatusCode::from_u16(*status)
                .map(|s| s.is_server_error())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            TransportError::Request { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
