//! Metrics
//!
//! Thin wrappers over the `metrics` facade. Nothing is recorded unless the
//! application installs a recorder.

/// Label values
pub mod labels {
    /// Password given directly, passfile not consulted
    pub const OUTCOME_EXPLICIT: &str = "explicit";
    /// Passfile entry matched
    pub const OUTCOME_MATCHED: &str = "matched";
    /// Passfile read but nothing matched
    pub const OUTCOME_NO_MATCH: &str = "no_match";
    /// Passfile missing, unreadable or rejected
    pub const OUTCOME_UNAVAILABLE: &str = "unavailable";
}

/// Counters
pub mod counters {
    use crate::connection::SslMode;

    /// Password lookup finished with `outcome`
    pub fn passfile_lookup(outcome: &'static str) {
        metrics::counter!(
            "fraiseql_connparams_passfile_lookups_total",
            "outcome" => outcome
        )
        .increment(1);
    }

    /// A TLS policy was built for `mode`
    pub fn tls_policy_built(mode: SslMode) {
        metrics::counter!(
            "fraiseql_connparams_tls_policies_total",
            "sslmode" => mode.as_str()
        )
        .increment(1);
    }

    /// Resolution aborted with a configuration error
    pub fn resolution_failed(kind: &'static str) {
        metrics::counter!(
            "fraiseql_connparams_resolution_errors_total",
            "kind" => kind
        )
        .increment(1);
    }
}
