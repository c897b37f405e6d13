//! Password file (`.pgpass`) reader
//!
//! Each non-blank, non-comment line holds `host:port:database:user:password`.
//! A backslash escapes the next character, so `\:` is a literal colon and
//! `\\` a literal backslash. Any field may be `*`, which matches everything.
//! The password field is last and keeps any further unescaped colons.

use crate::connection::Endpoint;
use crate::diagnostics::{Diagnostics, Warning};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Wildcard field value
pub const WILDCARD: &str = "*";

/// Number of fields in a passfile record
const FIELD_COUNT: usize = 5;

/// Byte ranges of the raw (still escaped) fields of a line.
///
/// First pass of the parser: only locates the unescaped colons. At most
/// four boundaries are recorded; everything after the fourth belongs to the
/// password.
fn field_bounds(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut bounds = Vec::with_capacity(FIELD_COUNT);
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() && bounds.len() < FIELD_COUNT - 1 {
        match bytes[i] {
            b'\\' => i += 2,
            b':' => {
                bounds.push((start, i));
                start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    bounds.push((start, bytes.len()));
    bounds
}

/// Split a line into its raw fields without unescaping them
pub fn split_fields(line: &str) -> Vec<&str> {
    field_bounds(line)
        .into_iter()
        .map(|(start, end)| &line[start..end])
        .collect()
}

/// Resolve backslash escapes in a single field
///
/// Second pass of the parser. A backslash makes the following character
/// literal; a trailing lone backslash is kept as is.
pub fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// One `host:port:database:user:password` record
#[derive(Clone, PartialEq, Eq)]
pub struct PassfileEntry {
    /// Host pattern
    pub host: String,
    /// Port pattern, compared as text
    pub port: String,
    /// Database pattern
    pub database: String,
    /// User pattern
    pub user: String,
    /// Password
    pub password: String,
}

impl PassfileEntry {
    /// Parse a single line
    ///
    /// Returns `None` for blank lines, comments, and lines with fewer than
    /// five fields.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let fields = split_fields(line);
        if fields.len() < FIELD_COUNT {
            return None;
        }

        Some(Self {
            host: unescape(fields[0]),
            port: unescape(fields[1]),
            database: unescape(fields[2]),
            user: unescape(fields[3]),
            password: unescape(fields[4]),
        })
    }

    /// Whether this record applies to the endpoint, database and user
    pub fn matches(&self, endpoint: &Endpoint, database: &str, user: &str) -> bool {
        field_matches(&self.host, endpoint.passfile_host())
            && field_matches(&self.port, &endpoint.port.to_string())
            && field_matches(&self.database, database)
            && field_matches(&self.user, user)
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

impl fmt::Debug for PassfileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassfileEntry")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parsed password file
#[derive(Debug, Clone, Default)]
pub struct Passfile {
    path: PathBuf,
    entries: Vec<PassfileEntry>,
}

impl Passfile {
    /// Read and parse the passfile at `path`.
    ///
    /// Never fails. A missing file, something other than a regular file, a
    /// file readable by group or other (when `check_permissions` is set) or a
    /// read error all yield an empty passfile and a warning in `diag`.
    pub fn load(path: &Path, check_permissions: bool, diag: &mut Diagnostics) -> Self {
        let empty = Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        };

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                diag.warn(Warning::PassfileNotFound {
                    path: path.to_path_buf(),
                });
                return empty;
            }
            Err(e) => {
                diag.warn(Warning::PassfileUnreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                return empty;
            }
        };

        if !metadata.is_file() {
            diag.warn(Warning::PassfileNotPlainFile {
                path: path.to_path_buf(),
            });
            return empty;
        }

        if check_permissions {
            if let Some(mode) = group_or_other_bits(&metadata) {
                diag.warn(Warning::PassfileInsecurePermissions {
                    path: path.to_path_buf(),
                    mode,
                });
                return empty;
            }
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(path, &contents, diag),
            Err(e) => {
                diag.warn(Warning::PassfileUnreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                empty
            }
        }
    }

    /// Parse passfile contents already in memory
    ///
    /// Lines with fewer than five fields are skipped with a warning.
    pub fn parse(path: &Path, contents: &str, diag: &mut Diagnostics) -> Self {
        let mut entries = Vec::new();

        for (idx, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match PassfileEntry::parse_line(trimmed) {
                Some(entry) => entries.push(entry),
                None => diag.warn(Warning::PassfileMalformedLine {
                    path: path.to_path_buf(),
                    line: idx + 1,
                }),
            }
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded password file");

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Path this passfile was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records in file order
    pub fn entries(&self) -> &[PassfileEntry] {
        &self.entries
    }

    /// Whether the file yielded no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First record matching any endpoint.
    ///
    /// Endpoints are tried in order, and for each endpoint the records in
    /// file order; the first hit wins.
    pub fn find(
        &self,
        endpoints: &[Endpoint],
        database: &str,
        user: &str,
    ) -> Option<&PassfileEntry> {
        for endpoint in endpoints {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|entry| entry.matches(endpoint, database, user))
            {
                tracing::debug!(
                    endpoint = %endpoint,
                    host = %entry.host,
                    port = %entry.port,
                    "password file entry matched"
                );
                return Some(entry);
            }
        }
        None
    }
}

#[cfg(unix)]
fn group_or_other_bits(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    (mode & 0o077 != 0).then_some(mode)
}

#[cfg(not(unix))]
fn group_or_other_bits(_metadata: &fs::Metadata) -> Option<u32> {
    None
}
