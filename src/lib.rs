//! fraiseql-connparams: turn a Postgres connection string into ready-to-use
//! connection parameters.
//!
//! Resolution covers three things:
//!
//! * **Endpoints**: hostnames, IP literals (with zone ids) and Unix socket
//!   directories normalized into an ordered `(address, port)` list.
//! * **Password**: an explicit password, or the first matching entry of the
//!   passfile (`~/.pgpass`, `%APPDATA%\postgresql\pgpass.conf`, or `passfile=`).
//! * **TLS**: the `sslmode` trust policy, materialized as a rustls
//!   `ClientConfig`.
//!
//! No network I/O happens here; the result is handed to a transport.
//!
//! ```no_run
//! # fn example() -> fraiseql_connparams::Result<()> {
//! let resolution = fraiseql_connparams::resolve_dsn(
//!     "postgres://app@db1:5432,db2:5432/orders?sslmode=verify-full&sslrootcert=/etc/ssl/pg-ca.pem",
//! )?;
//! for endpoint in &resolution.endpoints {
//!     println!("{}", endpoint);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod platform;

pub use client::{resolve, resolve_dsn, resolve_dsn_with, ConnectionParameters, Resolution};
pub use connection::{Endpoint, SslMode, TlsConfig};
pub use diagnostics::Warning;
pub use error::{Error, Result};
