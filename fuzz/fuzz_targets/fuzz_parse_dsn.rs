#![no_main]

use fraiseql_connparams::client::ConnectionDescriptor;
use fraiseql_connparams::connection::normalize_hosts;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Prefix half the inputs so the fuzzer spends time past the scheme check.
    let dsn = if data.len() % 2 == 0 {
        format!("postgres://{}", data)
    } else {
        data.to_string()
    };

    if let Ok(descriptor) = ConnectionDescriptor::parse(&dsn, &(), "fuzz") {
        let endpoints = normalize_hosts(&descriptor.hosts);
        assert_eq!(endpoints.len(), descriptor.hosts.len());
        for endpoint in &endpoints {
            let _ = endpoint.to_string();
            let _ = endpoint.passfile_host();
        }
    }
});
