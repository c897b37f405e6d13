//! Error types

use crate::client::ParseError;
use crate::connection::SslMode;
use thiserror::Error;

/// Errors that abort a resolution call.
///
/// Degraded passfile access (missing file, loose permissions) and a passfile
/// without a matching entry are not errors: they surface as
/// [`Warning`](crate::Warning)s and an absent password.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection string could not be turned into a descriptor
    #[error("invalid DSN: {0}")]
    Dsn(#[from] ParseError),

    /// Invalid configuration (unreadable certificate, bad key, ...)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Protocol version string that names no known TLS version
    #[error("No such TLS version: {0}")]
    UnknownTlsVersion(String),

    /// Legacy SSL protocol family
    #[error("Unsupported TLS version: {0}")]
    UnsupportedTlsVersion(String),

    /// Certificate verification requested without a root certificate
    #[error(
        "root certificate not found for sslmode={0}: either provide the file or change sslmode to disable certificate verification"
    )]
    MissingRootCert(SslMode),

    /// Error reported by rustls while building the client configuration
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
}

impl Error {
    /// Whether this error belongs to the configuration class (as opposed to
    /// a malformed connection string).
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Error::Dsn(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
