//! The Standard Profile lockfile: a `key=value` discovery file, written
//! atomically by the hub and read by clients to find it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Required lockfile keys (§4.2/§6).
pub const KEY_SECRET: &str = "samp.secret";
pub const KEY_HUB_XMLRPC_URL: &str = "samp.hub.xmlrpc.url";
pub const KEY_PROFILE_VERSION: &str = "samp.profile.version";

const REQUIRED_KEYS: [&str; 3] = [KEY_SECRET, KEY_HUB_XMLRPC_URL, KEY_PROFILE_VERSION];

const HEADER: &str = "# SAMP Standard Profile lockfile";

/// Errors from reading, writing, or validating a lockfile.
#[derive(Debug, Error)]
pub enum LockfileError {
    /// I/O failure reading or writing the lockfile.
    #[error("lockfile I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A required key was missing when the lockfile was validated.
    #[error("incomplete lock info: missing key '{0}'")]
    IncompleteLockInfo(String),
}

/// The parsed contents of a lockfile: an ordered `key=value` table.
/// Unknown keys are preserved; whitespace around `=` is tolerated on read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockInfo {
    entries: Vec<(String, String)>,
}

impl LockInfo {
    /// Start building a lock info from scratch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value.into();
        } else {
            self.entries.push((key, value.into()));
        }
        self
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Validate that every required key (§4.2) is present. Parsing
    /// itself never fails on a missing key; validation is explicit.
    pub fn validate(&self) -> Result<(), LockfileError> {
        for key in REQUIRED_KEYS {
            if self.get(key).is_none() {
                return Err(LockfileError::IncompleteLockInfo(key.to_string()));
            }
        }
        Ok(())
    }

    /// Build the standard lockfile contents: a fixed header, then the
    /// required keys in a stable order, then any others in insertion order.
    pub fn to_file_contents(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');

        let mut written = BTreeMap::new();
        for key in REQUIRED_KEYS {
            if let Some(v) = self.get(key) {
                out.push_str(&format!("{key}={v}\n"));
                written.insert(key, ());
            }
        }
        for (k, v) in &self.entries {
            if written.contains_key(k.as_str()) {
                continue;
            }
            out.push_str(&format!("{k}={v}\n"));
        }
        out
    }

    /// Parse `key=value` lines, tolerating arbitrary whitespace around `=`
    /// and `#`-prefixed comment lines.
    pub fn parse(contents: &str) -> Self {
        let mut info = Self::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                info.set(key.trim(), value.trim());
            }
        }
        info
    }
}

/// Write the lockfile atomically: write to a sibling `.tmp` file with
/// owner-only permissions, then rename over the target (§4.5).
pub fn write_atomic(path: &Path, info: &LockInfo) -> Result<(), LockfileError> {
    let contents = info.to_file_contents();
    let tmp_path = sibling_tmp_path(path);

    std::fs::write(&tmp_path, contents)?;
    restrict_to_owner(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read and parse a lockfile from disk without validating it.
pub fn read(path: &Path) -> Result<LockInfo, LockfileError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(LockInfo::parse(&contents))
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| format!(".{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| ".samp.tmp".to_string());
    path.with_file_name(file_name)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), LockfileError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<(), LockfileError> {
    Ok(())
}

/// Resolve the default lockfile path: `$HOME/.samp`.
pub fn default_path() -> PathBuf {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    home.join(".samp")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LockInfo {
        let mut info = LockInfo::new();
        info.set(KEY_SECRET, "abc123");
        info.set(KEY_HUB_XMLRPC_URL, "http://127.0.0.1:1234/xmlrpc");
        info.set(KEY_PROFILE_VERSION, "1.0");
        info
    }

    #[test]
    fn validates_complete_info() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_incomplete_info() {
        let mut info = LockInfo::new();
        info.set(KEY_SECRET, "abc123");
        assert!(info.validate().is_err());
    }

    #[test]
    fn round_trips_through_file_contents() {
        let info = sample();
        let text = info.to_file_contents();
        assert!(text.starts_with(HEADER));
        let parsed = LockInfo::parse(&text);
        assert_eq!(parsed.get(KEY_SECRET), Some("abc123"));
        parsed.validate().unwrap();
    }

    #[test]
    fn tolerates_whitespace_and_comments_and_unknown_keys() {
        let text = "# a comment\n  samp.secret = xyz  \nsamp.hub.custom=value\n";
        let parsed = LockInfo::parse(text);
        assert_eq!(parsed.get(KEY_SECRET), Some("xyz"));
        assert_eq!(parsed.get("samp.hub.custom"), Some("value"));
    }

    #[test]
    fn write_atomic_sets_owner_only_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".samp");
        write_atomic(&path, &sample()).unwrap();

        let read_back = read(&path).unwrap();
        read_back.validate().unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
