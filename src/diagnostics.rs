//! Non-fatal diagnostics collected during resolution
//!
//! Resolution never aborts because of a degraded passfile. Instead it records
//! a [`Warning`] here, mirrors it to `tracing`, and carries on without a
//! password. Callers get the collected warnings back with the
//! [`Resolution`](crate::Resolution) so they can surface them however they like.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A recoverable condition hit while resolving parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The passfile does not exist
    PassfileNotFound { path: PathBuf },
    /// The passfile exists but is not a regular file
    PassfileNotPlainFile { path: PathBuf },
    /// The passfile grants group or other permissions
    PassfileInsecurePermissions { path: PathBuf, mode: u32 },
    /// The passfile could not be read
    PassfileUnreadable { path: PathBuf, reason: String },
    /// A passfile line did not contain all five fields and was skipped
    PassfileMalformedLine { path: PathBuf, line: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassfileNotFound { path } => {
                write!(f, "password file {:?} does not exist", path)
            }
            Self::PassfileNotPlainFile { path } => {
                write!(f, "password file {:?} is not a plain file", path)
            }
            Self::PassfileInsecurePermissions { path, mode } => write!(
                f,
                "password file {:?} has group or world access ({:o}); permissions should be u=rw (0600) or less",
                path, mode
            ),
            Self::PassfileUnreadable { path, reason } => {
                write!(f, "password file {:?} could not be read: {}", path, reason)
            }
            Self::PassfileMalformedLine { path, line } => write!(
                f,
                "password file {:?} line {} does not have five fields, skipping",
                path, line
            ),
        }
    }
}

/// Collector for warnings raised during one resolution call
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and mirror it to the log
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Warnings recorded so far, in emission order
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Consume the collector
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
