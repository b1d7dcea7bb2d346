//! The exclusion manifest: one excluded source file name per line.
//!
//! An empty manifest means nothing is excluded. A missing manifest means
//! exclusion by manifest is not in use.

use crate::classify::is_draft;
use crate::error::{Result, SyncError};
use crate::tree::SourceEntry;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeSet<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest text, ignoring blank lines and surrounding whitespace.
    pub fn parse(text: &str) -> Self {
        Self {
            entries: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// List the entry names of every draft among `entries`.
    ///
    /// Unusable frontmatter counts as no frontmatter, so such documents are
    /// not drafts. Unreadable entries cannot be judged and are left out.
    pub fn from_drafts(entries: &[SourceEntry]) -> Self {
        let mut manifest = Self::new();
        for entry in entries {
            let SourceEntry::Document(doc) = entry else { continue };
            let frontmatter = doc.frontmatter().unwrap_or_else(|e| {
                warn!(document = %doc.id, error = %e, "unusable frontmatter, treating as empty");
                None
            });
            if is_draft(frontmatter.as_ref()) {
                manifest.insert(doc.entry_name());
            }
        }
        manifest
    }

    /// Read a manifest; `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse(&text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::io(path, e)),
        }
    }

    /// Write the manifest, creating or truncating the file.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        std::fs::write(path, self.render()).map_err(|e| SyncError::io(path, e))
    }

    pub fn render(&self) -> String {
        self.entries.iter().map(|e| format!("{e}\n")).collect()
    }

    pub fn insert(&mut self, entry: impl Into<String>) {
        self.entries.insert(entry.into());
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Layout};
    use crate::freshness::FileStamp;
    use crate::tree::Skipped;
    use tempfile::TempDir;

    #[test]
    fn test_from_drafts() {
        let stamp = FileStamp::from_unix(0);
        let entries = vec![
            SourceEntry::Document(Document::new("A", "/v/A.md", Layout::Flat, "---\ndraft: true\n---\n", stamp)),
            SourceEntry::Document(Document::new("B", "/v/B/index.md", Layout::Bundle, "---\ndraft: yes\n---\n", stamp)),
            SourceEntry::Document(Document::new("C", "/v/C.md", Layout::Flat, "---\ndraft: false\n---\n", stamp)),
            SourceEntry::Document(Document::new("D", "/v/D.md", Layout::Flat, "---\n: [\n---\n", stamp)),
            SourceEntry::Unreadable(Skipped {
                id: "E".into(),
                path: "/v/E.md".into(),
                reason: "denied".into(),
            }),
        ];

        let manifest = Manifest::from_drafts(&entries);
        assert_eq!(manifest.entries().collect::<Vec<_>>(), vec!["A.md", "B"]);
    }

    #[test]
    fn test_parse_ignores_blank_lines() {
        let manifest = Manifest::parse("A.md\n\n  B.md  \n");
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains("B.md"));
    }

    #[test]
    fn test_missing_differs_from_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".rsyncexclude");
        assert_eq!(Manifest::read(&path).unwrap(), None);

        Manifest::new().write(&path).unwrap();
        let empty = Manifest::read(&path).unwrap().unwrap();
        assert!(empty.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/exclude.txt");

        let mut manifest = Manifest::new();
        manifest.insert("Draft Two.md");
        manifest.insert("Draft One.md");
        manifest.write(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Draft One.md\nDraft Two.md\n");
        assert_eq!(Manifest::read(&path).unwrap(), Some(manifest));
    }
}
