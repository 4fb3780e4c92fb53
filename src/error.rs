use thiserror::Error;

use crate::http::TransportError;
use crate::package::PackageIdentity;

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Errors returned by feed queries and downloads.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The caller passed an unusable argument, such as an empty package id.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A feed page was not well-formed XML.
    #[error("Malformed feed at {uri}: {message}")]
    MalformedFeed { uri: String, message: String },

    /// A required entry field was missing or unparsable.
    #[error("Invalid feed entry: {0}")]
    Format(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Package '{0}' was not found")]
    PackageNotFound(PackageIdentity),

    #[error("Download rejected: {0}")]
    Download(String),

    #[error("Operation was cancelled")]
    Cancelled,
}
