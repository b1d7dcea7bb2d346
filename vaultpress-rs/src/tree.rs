//! Scanning the source vault and the destination buckets.

use crate::config::Config;
use crate::document::{identity, identity_of, Document, Layout, BUNDLE_INDEX};
use crate::error::{Result, SyncError};
use crate::freshness::FileStamp;
use glob::{glob, Pattern};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Skip hidden entries and section indexes (`_index.md`).
fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Expand a glob under `root`, escaping the root itself.
fn glob_under(root: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/{}", Pattern::escape(&root.to_string_lossy()), suffix);
    let mut paths = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => warn!(error = %e, "glob error"),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Markdown candidates found directly under a root.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub documents: Vec<(PathBuf, Layout)>,
    /// Flat files hidden by a bundle with the same identity.
    pub shadowed: Vec<(String, PathBuf)>,
}

/// Markdown candidates directly under `root`: `*.md` files and `*/index.md` bundles.
///
/// A bundle and a file with the same identity resolve to the bundle.
pub fn list_markdown(root: &Path) -> Result<Listing> {
    let mut found: BTreeMap<String, (PathBuf, Layout)> = BTreeMap::new();
    let mut shadowed = Vec::new();

    for path in glob_under(root, &format!("*/{}", BUNDLE_INDEX))? {
        let Some(dir) = path.parent() else { continue };
        if is_ignored(&entry_name(dir)) || !path.is_file() {
            continue;
        }
        if let Some(id) = identity_of(&path, Layout::Bundle) {
            found.insert(id, (path, Layout::Bundle));
        }
    }

    for path in glob_under(root, "*.md")? {
        if is_ignored(&entry_name(&path)) || !path.is_file() {
            continue;
        }
        let Some(id) = identity_of(&path, Layout::Flat) else { continue };
        if found.contains_key(&id) {
            warn!(document = %id, path = %path.display(), "bundle with the same name exists, ignoring file");
            shadowed.push((id, path));
            continue;
        }
        found.insert(id, (path, Layout::Flat));
    }

    Ok(Listing {
        documents: found.into_values().collect(),
        shadowed,
    })
}

/// A source entry left out of this run, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct Skipped {
    pub id: String,
    pub path: PathBuf,
    pub reason: String,
}

/// One scanned source entry.
#[derive(Debug, Clone)]
pub enum SourceEntry {
    Document(Document),
    /// Could not be read; its destination copies must be kept.
    Unreadable(Skipped),
    /// A file hidden by a bundle of the same name.
    Shadowed(Skipped),
}

impl SourceEntry {
    pub fn id(&self) -> &str {
        match self {
            SourceEntry::Document(doc) => &doc.id,
            SourceEntry::Unreadable(s) | SourceEntry::Shadowed(s) => &s.id,
        }
    }
}

/// The authoritative vault directory.
#[derive(Debug, Clone)]
pub struct SourceTree {
    pub root: PathBuf,
}

impl SourceTree {
    /// Open a source tree, failing with `MissingPath` if it is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SyncError::MissingPath(root));
        }
        Ok(Self { root })
    }

    /// Read every candidate document. Read failures become `Unreadable`
    /// entries instead of aborting the scan.
    pub fn scan(&self) -> Result<Vec<SourceEntry>> {
        let listing = list_markdown(&self.root)?;
        let mut entries: Vec<SourceEntry> = listing
            .documents
            .into_iter()
            .map(|(path, layout)| match Document::load(&path, layout) {
                Ok(doc) => SourceEntry::Document(doc),
                Err(e) => {
                    let id = identity_of(&path, layout)
                        .unwrap_or_else(|| path.to_string_lossy().into_owned());
                    warn!(document = %id, error = %e, "cannot read source document");
                    SourceEntry::Unreadable(Skipped {
                        id,
                        path,
                        reason: e.to_string(),
                    })
                }
            })
            .collect();

        entries.extend(listing.shadowed.into_iter().map(|(id, path)| {
            SourceEntry::Shadowed(Skipped {
                id,
                path,
                reason: "a bundle with the same name exists".to_string(),
            })
        }));
        Ok(entries)
    }
}

/// Where a destination artifact currently lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub bucket: String,
    /// The artifact: bundle directory or markdown file.
    pub path: PathBuf,
    pub layout: Layout,
    #[serde(skip)]
    pub stamp: FileStamp,
}

impl Placement {
    /// Path of the markdown file inside the artifact.
    pub fn markdown_path(&self) -> PathBuf {
        match self.layout {
            Layout::Flat => self.path.clone(),
            Layout::Bundle => self.path.join(BUNDLE_INDEX),
        }
    }
}

/// Every artifact found across the destination buckets, by identity.
#[derive(Debug, Clone, Default)]
pub struct DestinationState {
    placements: BTreeMap<String, Vec<Placement>>,
}

impl DestinationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan all configured buckets. A bucket directory that does not exist yet
    /// is treated as empty.
    pub fn scan(config: &Config) -> Result<Self> {
        let mut state = Self::new();
        for (bucket, dest) in &config.destinations {
            if !dest.path.is_dir() {
                debug!(bucket = %bucket, path = %dest.path.display(), "destination not present yet");
                continue;
            }
            state.scan_bucket(bucket, &dest.path)?;
        }
        Ok(state)
    }

    /// Add every artifact under `root` to the state as members of `bucket`.
    pub fn scan_bucket(&mut self, bucket: &str, root: &Path) -> Result<()> {
        let mut without_index = BTreeSet::new();
        for entry in std::fs::read_dir(root).map_err(|e| SyncError::io(root, e))? {
            let entry = entry.map_err(|e| SyncError::io(root, e))?;
            let path = entry.path();
            let name = entry_name(&path);
            if is_ignored(&name) {
                continue;
            }

            let (id, layout, markdown) = if path.is_dir() {
                let index = path.join(BUNDLE_INDEX);
                if !index.is_file() {
                    without_index.insert(name);
                    continue;
                }
                (identity(&name), Layout::Bundle, index)
            } else if path.extension().is_some_and(|e| e == "md") {
                match identity_of(&path, Layout::Flat) {
                    Some(id) => (id, Layout::Flat, path.clone()),
                    None => continue,
                }
            } else {
                continue;
            };

            let stamp = match FileStamp::of(&markdown) {
                Ok(stamp) => stamp,
                Err(e) => {
                    warn!(bucket = %bucket, entry = %name, error = %e, "cannot stat destination entry, leaving it alone");
                    continue;
                }
            };
            self.insert(
                id,
                Placement {
                    bucket: bucket.to_string(),
                    path,
                    layout,
                    stamp,
                },
            );
        }

        if !without_index.is_empty() {
            debug!(bucket = %bucket, dirs = ?without_index, "directories without index.md left alone");
        }
        Ok(())
    }

    pub fn insert(&mut self, id: impl AsRef<str>, placement: Placement) {
        let list = self.placements.entry(identity(id.as_ref())).or_default();
        list.push(placement);
        list.sort_by(|a, b| (&a.bucket, &a.path).cmp(&(&b.bucket, &b.path)));
    }

    /// Placements of one identity, sorted by bucket then path.
    pub fn get(&self, id: &str) -> &[Placement] {
        self.placements.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.placements.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_list_markdown_files_and_bundles() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "A.md", "a");
        write(dir.path(), "B/index.md", "b");
        write(dir.path(), "B/photo.png", "png");
        write(dir.path(), ".hidden.md", "h");
        write(dir.path(), "_index.md", "section");
        write(dir.path(), "notes.txt", "t");
        write(dir.path(), "Empty/other.md", "nested");

        let listed: Vec<_> = list_markdown(dir.path())
            .unwrap()
            .documents
            .into_iter()
            .map(|(p, l)| (p.strip_prefix(dir.path()).unwrap().to_path_buf(), l))
            .collect();

        assert_eq!(
            listed,
            vec![
                (PathBuf::from("A.md"), Layout::Flat),
                (PathBuf::from("B/index.md"), Layout::Bundle),
            ]
        );
    }

    #[test]
    fn test_bundle_wins_over_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Post.md", "file");
        write(dir.path(), "Post/index.md", "bundle");

        let listed = list_markdown(dir.path()).unwrap();
        assert_eq!(listed.documents.len(), 1);
        assert_eq!(listed.documents[0].1, Layout::Bundle);
        assert_eq!(listed.shadowed, vec![("Post".to_string(), dir.path().join("Post.md"))]);

        let entries = SourceTree::open(dir.path()).unwrap().scan().unwrap();
        assert!(matches!(&entries[1], SourceEntry::Shadowed(s) if s.id == "Post"));
    }

    #[test]
    fn test_root_with_glob_metacharacters() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("08 - Blog [vault]");
        write(&root, "A.md", "a");
        assert_eq!(list_markdown(&root).unwrap().documents.len(), 1);
    }

    #[test]
    fn test_open_missing_source() {
        let result = SourceTree::open("/no/such/vault");
        assert!(matches!(result, Err(SyncError::MissingPath(_))));
    }

    #[test]
    fn test_scan_reports_unreadable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Good.md", "ok");
        std::fs::write(dir.path().join("Bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let entries = SourceTree::open(dir.path()).unwrap().scan().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], SourceEntry::Unreadable(u) if u.id == "Bad"));
        assert!(matches!(&entries[1], SourceEntry::Document(d) if d.id == "Good"));
    }

    #[test]
    fn test_scan_bucket() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "A/index.md", "a");
        write(dir.path(), "B.md", "b");
        write(dir.path(), "images/logo.png", "png");
        write(dir.path(), ".DS_Store", "");

        let mut state = DestinationState::new();
        state.scan_bucket("italian", dir.path()).unwrap();

        assert_eq!(state.ids().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(state.get("A")[0].layout, Layout::Bundle);
        assert_eq!(state.get("A")[0].markdown_path(), dir.path().join("A/index.md"));
        assert_eq!(state.get("B")[0].layout, Layout::Flat);
        assert!(state.get("images").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_bucket_skips_dangling_entry() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "A.md", "a");
        std::os::unix::fs::symlink(dir.path().join("nowhere.md"), dir.path().join("Ghost.md")).unwrap();

        let mut state = DestinationState::new();
        state.scan_bucket("italian", dir.path()).unwrap();

        assert_eq!(state.ids().collect::<Vec<_>>(), vec!["A"]);
    }
}
