//! Endpoint normalization
//!
//! Host descriptors come in three shapes (DNS name, IP literal, socket
//! directory). Everything downstream only needs `(address, port)` pairs.

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

/// Port used for Unix socket endpoints
///
/// A socket directory does not carry a port of its own.
pub const DEFAULT_PORT: u16 = 5432;

/// Host descriptor as produced by the connection string parser
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    /// DNS hostname and port
    Hostname(String, u16),
    /// IP literal, port and optional zone (scope) id
    IP(IpAddr, u16, Option<String>),
    /// Unix socket directory
    Path(String),
}

impl Host {
    /// Whether this host is reached over TCP
    pub fn is_tcp(&self) -> bool {
        matches!(self, Host::Hostname(..) | Host::IP(..))
    }
}

/// Normalized `(address, port)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    /// Hostname, IP literal (`addr%zone` when scoped) or socket path
    pub address: String,
    /// TCP port, or [`DEFAULT_PORT`] for sockets
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Whether the address is a Unix socket directory
    pub fn is_unix_socket(&self) -> bool {
        self.address.starts_with('/')
    }

    /// Host name to compare against passfile entries
    ///
    /// Socket endpoints are matched as `localhost`.
    pub fn passfile_host(&self) -> &str {
        if self.is_unix_socket() {
            "localhost"
        } else {
            &self.address
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unix_socket() {
            write!(f, "{}/.s.PGSQL.{}", self.address, self.port)
        } else if self.address.contains(':') {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

impl From<&Host> for Endpoint {
    fn from(host: &Host) -> Self {
        match host {
            Host::Hostname(name, port) => Endpoint::new(name.clone(), *port),
            Host::IP(addr, port, Some(zone)) if !zone.is_empty() => {
                Endpoint::new(format!("{}%{}", addr, zone), *port)
            }
            Host::IP(addr, port, _) => Endpoint::new(addr.to_string(), *port),
            Host::Path(path) => Endpoint::new(path.clone(), DEFAULT_PORT),
        }
    }
}

/// Normalize host descriptors, preserving their order
pub fn normalize_hosts(hosts: &[Host]) -> Vec<Endpoint> {
    hosts.iter().map(Endpoint::from).collect()
}
