//! Password resolution
//!
//! An explicit password always wins. Otherwise the passfile (explicit or the
//! platform default) is searched for the first entry matching one of the
//! endpoints, in endpoint order.

use super::passfile::Passfile;
use crate::connection::Endpoint;
use crate::diagnostics::Diagnostics;
use crate::metrics;
use crate::platform::Platform;
use std::fmt;
use std::path::PathBuf;

/// Where the password comes from
#[derive(Clone, Default, PartialEq, Eq)]
pub enum PasswordSource {
    /// Nothing specified, consult the platform's default passfile
    #[default]
    Unspecified,
    /// Password given directly
    Specified(String),
    /// Passfile named explicitly
    Passfile(PathBuf),
}

impl fmt::Debug for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("Unspecified"),
            Self::Specified(_) => f.debug_tuple("Specified").field(&"<redacted>").finish(),
            Self::Passfile(path) => f.debug_tuple("Passfile").field(path).finish(),
        }
    }
}

/// Resolve the effective password.
///
/// Returns `None` when no password was given and no passfile entry matched;
/// the caller decides whether connecting without one is acceptable.
pub fn resolve_password(
    source: &PasswordSource,
    endpoints: &[Endpoint],
    database: &str,
    user: &str,
    platform: &dyn Platform,
    diag: &mut Diagnostics,
) -> Option<String> {
    let path = match source {
        PasswordSource::Specified(password) => {
            metrics::counters::passfile_lookup(metrics::labels::OUTCOME_EXPLICIT);
            return Some(password.clone());
        }
        PasswordSource::Passfile(path) => path.clone(),
        PasswordSource::Unspecified => match platform.default_passfile() {
            Some(path) => path,
            None => {
                tracing::debug!("no home directory, skipping password file");
                metrics::counters::passfile_lookup(metrics::labels::OUTCOME_UNAVAILABLE);
                return None;
            }
        },
    };

    let passfile = Passfile::load(&path, platform.checks_file_permissions(), diag);
    if passfile.is_empty() {
        metrics::counters::passfile_lookup(metrics::labels::OUTCOME_UNAVAILABLE);
        return None;
    }

    match passfile.find(endpoints, database, user) {
        Some(entry) => {
            metrics::counters::passfile_lookup(metrics::labels::OUTCOME_MATCHED);
            Some(entry.password.clone())
        }
        None => {
            tracing::debug!(path = %path.display(), "no password file entry matched");
            metrics::counters::passfile_lookup(metrics::labels::OUTCOME_NO_MATCH);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Warning;
    use crate::platform::FixedPlatform;
    use std::fs;
    use std::path::Path;

    fn write_passfile(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(".pgpass");
        fs::write(&path, contents).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        }
        path
    }

    #[test]
    fn test_specified_password_skips_passfile() {
        let platform = FixedPlatform::posix("/nonexistent", "u");
        let mut diag = Diagnostics::new();
        let password = resolve_password(
            &PasswordSource::Specified("secret".into()),
            &[Endpoint::new("h", 5432)],
            "db",
            "u",
            &platform,
            &mut diag,
        );
        assert_eq!(password.as_deref(), Some("secret"));
        // The default passfile was never looked at
        assert!(diag.is_empty());
    }

    #[test]
    fn test_explicit_passfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_passfile(dir.path(), "h:5432:db:u:from-file\n");
        let platform = FixedPlatform::default();
        let mut diag = Diagnostics::new();
        let password = resolve_password(
            &PasswordSource::Passfile(path),
            &[Endpoint::new("h", 5432)],
            "db",
            "u",
            &platform,
            &mut diag,
        );
        assert_eq!(password.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_default_passfile_from_platform() {
        let dir = tempfile::tempdir().unwrap();
        write_passfile(dir.path(), "*:*:*:*:default-pw\n");
        let platform = FixedPlatform::posix(dir.path(), "u");
        let mut diag = Diagnostics::new();
        let password = resolve_password(
            &PasswordSource::Unspecified,
            &[Endpoint::new("h", 5432)],
            "db",
            "u",
            &platform,
            &mut diag,
        );
        assert_eq!(password.as_deref(), Some("default-pw"));
    }

    #[test]
    fn test_missing_passfile_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let platform = FixedPlatform::posix(dir.path(), "u");
        let mut diag = Diagnostics::new();
        let password = resolve_password(
            &PasswordSource::Unspecified,
            &[Endpoint::new("h", 5432)],
            "db",
            "u",
            &platform,
            &mut diag,
        );
        assert!(password.is_none());
        assert!(matches!(diag.warnings(), [Warning::PassfileNotFound { .. }]));
    }

    #[test]
    fn test_no_home_directory() {
        let platform = FixedPlatform::default();
        let mut diag = Diagnostics::new();
        let password = resolve_password(
            &PasswordSource::Unspecified,
            &[Endpoint::new("h", 5432)],
            "db",
            "u",
            &platform,
            &mut diag,
        );
        assert!(password.is_none());
        assert!(diag.is_empty());
    }

    #[test]
    fn test_second_host_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_passfile(dir.path(), "10.0.0.2:5432:app:svc:hunter2\n");
        let platform = FixedPlatform::default();
        let mut diag = Diagnostics::new();
        let password = resolve_password(
            &PasswordSource::Passfile(path),
            &[Endpoint::new("10.0.0.1", 5432), Endpoint::new("10.0.0.2", 5432)],
            "app",
            "svc",
            &platform,
            &mut diag,
        );
        assert_eq!(password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_debug_redacts_specified_password() {
        let source = PasswordSource::Specified("hunter2".into());
        assert!(!format!("{:?}", source).contains("hunter2"));
    }
}
