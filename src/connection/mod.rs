//! Connection targets and security
//!
//! This module handles:
//! * Endpoint normalization (hostname, IP with zone id, Unix socket directory)
//! * The `sslmode` trust policy and its rustls materialization

mod endpoint;
mod tls;
mod verify;

pub use endpoint::{normalize_hosts, Endpoint, Host, DEFAULT_PORT};
pub use tls::{ClientCertificate, SslMode, SslParameters, TlsConfig, TlsPolicy, TlsVersion};
