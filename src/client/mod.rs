//! Connection string parsing and parameter resolution

mod connection_string;
mod params;

pub use connection_string::{
    ConnectionDescriptor, Environment, ParseError, ProcessEnv, Ssl, DEFAULT_HOSTS,
};
pub use params::{resolve, resolve_dsn, resolve_dsn_with, ConnectionParameters, Resolution};
