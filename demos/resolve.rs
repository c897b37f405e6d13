//! Resolve a connection string and print what a client would use
//!
//! Run with: cargo run --example resolve -- "postgres://user@host/db?sslmode=require"
//!
//! Set `RUST_LOG=fraiseql_connparams=debug` to see the passfile lookup.

use fraiseql_connparams::resolve_dsn;
use serde_json::json;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(dsn) = std::env::args().nth(1) else {
        eprintln!("usage: resolve <connection string>");
        return ExitCode::from(2);
    };

    let resolution = match resolve_dsn(&dsn) {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let params = &resolution.params;
    let tls = params.ssl().map(|tls| {
        json!({
            "verify_peer": tls.verify_peer(),
            "verify_hostname": tls.verify_hostname(),
            "root_cert": tls.policy().root_cert(),
            "crl": tls.policy().crl(),
            "client_cert": tls.policy().client_cert().is_some(),
        })
    });

    let summary = json!({
        "endpoints": resolution.endpoints,
        "user": params.user(),
        "database": params.database(),
        "password": params.password().map(|_| "<redacted>"),
        "sslmode": params.sslmode(),
        "tls": tls,
        "connect_timeout": params.connect_timeout(),
        "server_settings": params.server_settings(),
        "warnings": resolution.warnings,
    });

    match serde_json::to_string_pretty(&summary) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
