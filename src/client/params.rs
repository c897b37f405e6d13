//! Resolved connection parameters

use super::connection_string::{ConnectionDescriptor, Environment, ProcessEnv, Ssl};
use crate::auth::resolve_password;
use crate::connection::{normalize_hosts, Endpoint, SslMode, TlsConfig, TlsPolicy};
use crate::diagnostics::{Diagnostics, Warning};
use crate::platform::{Platform, SystemPlatform};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Everything needed to open a connection, minus the address
///
/// Built once per resolution and never modified afterwards.
#[derive(Clone)]
pub struct ConnectionParameters {
    user: String,
    password: Option<String>,
    database: String,
    ssl: Option<TlsConfig>,
    sslmode: SslMode,
    server_settings: HashMap<String, String>,
    connect_timeout: Option<u64>,
}

impl ConnectionParameters {
    /// Username
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Password, if one was given or found in the passfile
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Password, empty when none was found
    pub fn password_or_empty(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    /// Database name
    pub fn database(&self) -> &str {
        &self.database
    }

    /// TLS configuration; present iff `sslmode` is not `disable`
    pub fn ssl(&self) -> Option<&TlsConfig> {
        self.ssl.as_ref()
    }

    /// Effective `sslmode`
    pub fn sslmode(&self) -> SslMode {
        self.sslmode
    }

    /// Settings sent to the server at startup
    pub fn server_settings(&self) -> &HashMap<String, String> {
        &self.server_settings
    }

    /// Connect timeout in seconds
    pub fn connect_timeout(&self) -> Option<u64> {
        self.connect_timeout
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .field("sslmode", &self.sslmode)
            .field("server_settings", &self.server_settings)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Result of resolving a connection descriptor
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Endpoints to try, in the order given
    pub endpoints: Vec<Endpoint>,
    /// Connection parameters
    pub params: ConnectionParameters,
    /// Non-fatal problems hit along the way
    pub warnings: Vec<Warning>,
}

/// Resolve a parsed descriptor.
///
/// Builds the TLS configuration first, so that configuration errors abort
/// before the passfile is read, then normalizes the hosts and looks up the
/// password.
///
/// # Errors
///
/// Fails on TLS configuration problems only (bad protocol version, missing
/// root certificate for `verify-ca`/`verify-full`, unreadable certificate
/// files). Passfile problems become warnings.
pub fn resolve(descriptor: &ConnectionDescriptor, platform: &dyn Platform) -> Result<Resolution> {
    let (ssl, sslmode) = build_tls(&descriptor.ssl, platform).map_err(|e| {
        crate::metrics::counters::resolution_failed(error_kind(&e));
        e
    })?;

    let endpoints = normalize_hosts(&descriptor.hosts);

    let mut diag = Diagnostics::new();
    let password = resolve_password(
        &descriptor.password,
        &endpoints,
        &descriptor.database,
        &descriptor.user,
        platform,
        &mut diag,
    );

    tracing::debug!(
        endpoints = endpoints.len(),
        user = %descriptor.user,
        database = %descriptor.database,
        sslmode = %sslmode,
        password = password.is_some(),
        "resolved connection parameters"
    );

    Ok(Resolution {
        endpoints,
        params: ConnectionParameters {
            user: descriptor.user.clone(),
            password,
            database: descriptor.database.clone(),
            ssl,
            sslmode,
            server_settings: descriptor.server_settings.clone(),
            connect_timeout: descriptor.connect_timeout.map(|d| d.as_secs()),
        },
        warnings: diag.into_warnings(),
    })
}

/// Parse and resolve a connection string using the process environment
pub fn resolve_dsn(dsn: &str) -> Result<Resolution> {
    resolve_dsn_with(dsn, &ProcessEnv, &SystemPlatform)
}

/// Parse and resolve a connection string against an explicit environment
/// and platform
pub fn resolve_dsn_with(
    dsn: &str,
    env: &impl Environment,
    platform: &dyn Platform,
) -> Result<Resolution> {
    let descriptor =
        ConnectionDescriptor::parse(dsn, env, &platform.current_user()).map_err(|e| {
            crate::metrics::counters::resolution_failed("dsn");
            Error::Dsn(e)
        })?;
    resolve(&descriptor, platform)
}

fn build_tls(ssl: &Ssl, platform: &dyn Platform) -> Result<(Option<TlsConfig>, SslMode)> {
    match ssl {
        Ssl::Disable => Ok((None, SslMode::Disable)),
        Ssl::Enable(mode, params) => {
            let postgres_dir = platform.postgres_dir();
            let params = params.resolve_paths(*mode, postgres_dir.as_deref());
            let tls = TlsPolicy::build(*mode, &params)?
                .map(TlsConfig::from_policy)
                .transpose()?;
            Ok((tls, *mode))
        }
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Dsn(_) => "dsn",
        Error::UnknownTlsVersion(_) | Error::UnsupportedTlsVersion(_) => "tls_version",
        Error::MissingRootCert(_) => "missing_root_cert",
        Error::Config(_) | Error::Tls(_) => "config",
    }
}
