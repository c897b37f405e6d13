//! Platform environment
//!
//! Everything the resolver needs to know about the host it runs on (home
//! directory, default passfile location, current user) comes through the
//! [`Platform`] trait, so tests can pin these down instead of depending on the
//! machine they run on.

use std::path::PathBuf;

/// Passfile name on POSIX systems, relative to the home directory
pub const POSIX_PASSFILE: &str = ".pgpass";

/// Passfile name on Windows, relative to `%APPDATA%\postgresql`
pub const WINDOWS_PASSFILE: &str = "pgpass.conf";

/// Source of host-specific defaults
pub trait Platform {
    /// The user's home directory
    fn home_dir(&self) -> Option<PathBuf>;

    /// Directory holding the default client certificates (`root.crt`, ...)
    fn postgres_dir(&self) -> Option<PathBuf>;

    /// Location of the passfile consulted when none is named explicitly
    fn default_passfile(&self) -> Option<PathBuf>;

    /// Operating system user name, used as the default database user
    fn current_user(&self) -> String;

    /// Whether the passfile must not be readable by group or other
    fn checks_file_permissions(&self) -> bool;
}

/// The platform the process is actually running on
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPlatform;

impl SystemPlatform {
    #[cfg(windows)]
    fn app_data_dir() -> Option<PathBuf> {
        // %APPDATA% is the roaming config directory
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("postgresql"))
    }
}

impl Platform for SystemPlatform {
    fn home_dir(&self) -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
    }

    #[cfg(not(windows))]
    fn postgres_dir(&self) -> Option<PathBuf> {
        self.home_dir().map(|home| home.join(".postgresql"))
    }

    #[cfg(windows)]
    fn postgres_dir(&self) -> Option<PathBuf> {
        Self::app_data_dir()
    }

    #[cfg(not(windows))]
    fn default_passfile(&self) -> Option<PathBuf> {
        self.home_dir().map(|home| home.join(POSIX_PASSFILE))
    }

    #[cfg(windows)]
    fn default_passfile(&self) -> Option<PathBuf> {
        Self::app_data_dir().map(|dir| dir.join(WINDOWS_PASSFILE))
    }

    fn current_user(&self) -> String {
        whoami::username()
    }

    fn checks_file_permissions(&self) -> bool {
        cfg!(unix)
    }
}

/// Platform with fixed answers
///
/// Handy for tests and for embedding the resolver where the process
/// environment should not leak in.
#[derive(Debug, Clone, Default)]
pub struct FixedPlatform {
    /// Home directory
    pub home: Option<PathBuf>,
    /// Certificate directory
    pub postgres_dir: Option<PathBuf>,
    /// Default passfile
    pub passfile: Option<PathBuf>,
    /// Current user
    pub user: String,
    /// Enforce passfile permissions
    pub check_permissions: bool,
}

impl FixedPlatform {
    /// POSIX-style layout rooted at `home`
    pub fn posix(home: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        let home = home.into();
        Self {
            postgres_dir: Some(home.join(".postgresql")),
            passfile: Some(home.join(POSIX_PASSFILE)),
            home: Some(home),
            user: user.into(),
            check_permissions: cfg!(unix),
        }
    }
}

impl Platform for FixedPlatform {
    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn postgres_dir(&self) -> Option<PathBuf> {
        self.postgres_dir.clone()
    }

    fn default_passfile(&self) -> Option<PathBuf> {
        self.passfile.clone()
    }

    fn current_user(&self) -> String {
        self.user.clone()
    }

    fn checks_file_permissions(&self) -> bool {
        self.check_permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_platform_posix_layout() {
        let platform = FixedPlatform::posix("/home/alice", "alice");
        assert_eq!(
            platform.default_passfile(),
            Some(PathBuf::from("/home/alice/.pgpass"))
        );
        assert_eq!(
            platform.postgres_dir(),
            Some(PathBuf::from("/home/alice/.postgresql"))
        );
        assert_eq!(platform.current_user(), "alice");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_platform_passfile_name() {
        if let Some(path) = SystemPlatform.default_passfile() {
            assert!(path.ends_with(POSIX_PASSFILE));
        }
        assert!(SystemPlatform.checks_file_permissions());
    }

    #[test]
    fn test_system_platform_user_not_empty() {
        assert!(!SystemPlatform.current_user().is_empty());
    }
}
