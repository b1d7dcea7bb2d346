//! Modification stamps and the "is the source newer" comparison.

use crate::error::{Result, SyncError};
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The modification time of a document or attachment, captured at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileStamp {
    pub modified: SystemTime,
}

impl FileStamp {
    /// Read the stamp of a file on disk.
    pub fn of(path: &Path) -> Result<Self> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| SyncError::io(path, e))?;
        Ok(Self { modified })
    }

    /// A stamp at a fixed number of seconds after the epoch.
    pub fn from_unix(secs: u64) -> Self {
        Self {
            modified: UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    /// Give `path` this stamp, so later comparisons see it as a faithful copy.
    pub fn apply_to(&self, path: &Path) -> Result<()> {
        let file = File::options()
            .write(true)
            .open(path)
            .map_err(|e| SyncError::io(path, e))?;
        file.set_modified(self.modified)
            .map_err(|e| SyncError::io(path, e))
    }
}

/// Returns true when `source` was modified strictly after `dest`.
pub fn is_newer(source: &FileStamp, dest: &FileStamp) -> bool {
    source.modified > dest.modified
}

/// Decides whether a destination copy is stale relative to its source.
pub trait Freshness {
    fn is_newer(&self, source: &FileStamp, dest: &FileStamp) -> bool;
}

/// Compare modification times.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mtime;

impl Freshness for Mtime {
    fn is_newer(&self, source: &FileStamp, dest: &FileStamp) -> bool {
        is_newer(source, dest)
    }
}

/// Treat every destination copy as stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysStale;

impl Freshness for AlwaysStale {
    fn is_newer(&self, _source: &FileStamp, _dest: &FileStamp) -> bool {
        true
    }
}

impl<F: Fn(&FileStamp, &FileStamp) -> bool> Freshness for F {
    fn is_newer(&self, source: &FileStamp, dest: &FileStamp) -> bool {
        self(source, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_newer() {
        let old = FileStamp::from_unix(100);
        let new = FileStamp::from_unix(200);
        assert!(is_newer(&new, &old));
        assert!(!is_newer(&old, &new));
        assert!(!is_newer(&old, &old));
    }

    #[test]
    fn test_comparators() {
        let a = FileStamp::from_unix(1);
        assert!(!Mtime.is_newer(&a, &a));
        assert!(AlwaysStale.is_newer(&a, &a));

        let never = |_: &FileStamp, _: &FileStamp| false;
        assert!(!never.is_newer(&FileStamp::from_unix(9), &a));
    }

    #[test]
    fn test_apply_stamp_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.md");
        std::fs::write(&path, "body").unwrap();

        let stamp = FileStamp::from_unix(1_600_000_000);
        stamp.apply_to(&path).unwrap();

        assert_eq!(FileStamp::of(&path).unwrap(), stamp);
    }

    #[test]
    fn test_stamp_of_missing_file_names_path() {
        let err = FileStamp::of(Path::new("/definitely/not/here.md")).unwrap_err();
        assert!(err.to_string().contains("not/here.md"));
    }
}
