#![no_main]

use fraiseql_connparams::auth::passfile::{split_fields, unescape};
use fraiseql_connparams::auth::{Passfile, PassfileEntry};
use fraiseql_connparams::diagnostics::Diagnostics;
use fraiseql_connparams::Endpoint;
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &str| {
    for line in data.lines() {
        let fields = split_fields(line);
        assert!(fields.len() <= 5);
        for field in &fields {
            let _ = unescape(field);
        }

        if let Some(entry) = PassfileEntry::parse_line(line) {
            let _ = entry.matches(&Endpoint::new("localhost", 5432), "db", "user");
        }
    }

    // A whole file must parse without panicking, whatever it contains.
    let mut diag = Diagnostics::new();
    let passfile = Passfile::parse(Path::new("fuzz"), data, &mut diag);
    let endpoints = [
        Endpoint::new("localhost", 5432),
        Endpoint::new("/tmp", 5432),
    ];
    let _ = passfile.find(&endpoints, "db", "user");
});
