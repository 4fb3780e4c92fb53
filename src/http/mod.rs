//! HTTP transport for package sources, with retry and credential support.

pub mod credentials;
mod error;
mod retry;
mod transport;

pub use credentials::{
    CredentialProvider, CredentialRequest, CredentialResponse, EnvCredentialProvider, NoCredentials,
};
pub use error::TransportError;
pub use retry::{MAX_RETRIES, RETRY_DELAY_MS, RetryPolicy, with_retry};
pub use transport::{ClientConfig, HttpTransport, HttpTransportFactory, Transport};

#[cfg(test)]
pub use transport::MockTransport;
