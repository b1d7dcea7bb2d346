//! Document representation: one post, stored as a file or as a bundle.

use crate::error::{Result, SyncError};
use crate::freshness::FileStamp;
use crate::parser::{self, FrontMatter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// File name of the markdown entry inside a bundle.
pub const BUNDLE_INDEX: &str = "index.md";

/// How a document is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<root>/<id>.md`
    Flat,
    /// `<root>/<id>/index.md` plus sibling attachments.
    #[default]
    Bundle,
}

impl Layout {
    /// Path of the markdown file for `id` under `root`.
    pub fn markdown_path(self, root: &Path, id: &str) -> PathBuf {
        match self {
            Layout::Flat => root.join(format!("{id}.md")),
            Layout::Bundle => root.join(id).join(BUNDLE_INDEX),
        }
    }

    /// Path of the whole artifact (file or bundle directory) for `id`.
    pub fn artifact_path(self, root: &Path, id: &str) -> PathBuf {
        match self {
            Layout::Flat => root.join(format!("{id}.md")),
            Layout::Bundle => root.join(id),
        }
    }
}

/// Normalize a name into an identity (Unicode NFC).
pub fn identity(name: &str) -> String {
    name.nfc().collect()
}

/// A markdown document read from disk.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable name: file stem or bundle directory name, NFC-normalized.
    pub id: String,

    /// Full path to the markdown file.
    pub path: PathBuf,

    pub layout: Layout,

    /// Raw content of the document.
    pub content: String,

    pub stamp: FileStamp,
}

impl Document {
    /// Create a document from parts.
    pub fn new(
        id: impl AsRef<str>,
        path: impl Into<PathBuf>,
        layout: Layout,
        content: impl Into<String>,
        stamp: FileStamp,
    ) -> Self {
        Self {
            id: identity(id.as_ref()),
            path: path.into(),
            layout,
            content: content.into(),
            stamp,
        }
    }

    /// Load a document from its markdown path.
    pub fn load(path: &Path, layout: Layout) -> Result<Self> {
        let id = identity_of(path, layout)
            .ok_or_else(|| SyncError::Other(format!("Cannot derive a name from {}", path.display())))?;
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let stamp = FileStamp::of(path)?;
        Ok(Self {
            id,
            path: path.to_path_buf(),
            layout,
            content,
            stamp,
        })
    }

    /// Read the frontmatter, reporting this document's path on failure.
    pub fn frontmatter(&self) -> Result<Option<FrontMatter>> {
        parser::read_frontmatter_with_path(&self.content, &self.path)
    }

    /// Get content without frontmatter.
    pub fn body(&self) -> &str {
        parser::remove_all_frontmatter(&self.content)
    }

    /// The bundle directory holding this document, if it is a bundle.
    pub fn bundle_dir(&self) -> Option<&Path> {
        match self.layout {
            Layout::Bundle => self.path.parent(),
            Layout::Flat => None,
        }
    }

    /// The entry name in its parent tree (`X.md` for files, `X` for bundles).
    pub fn entry_name(&self) -> String {
        let entry = match self.layout {
            Layout::Flat => self.path.file_name(),
            Layout::Bundle => self.path.parent().and_then(Path::file_name),
        };
        entry
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Derive the identity from a markdown path for the given layout.
pub fn identity_of(path: &Path, layout: Layout) -> Option<String> {
    let name = match layout {
        Layout::Flat => path.file_stem(),
        Layout::Bundle => path.parent().and_then(Path::file_name),
    }?;
    Some(identity(&name.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let root = Path::new("/site/it/posts");
        assert_eq!(
            Layout::Flat.markdown_path(root, "Hello"),
            PathBuf::from("/site/it/posts/Hello.md")
        );
        assert_eq!(
            Layout::Bundle.markdown_path(root, "Hello"),
            PathBuf::from("/site/it/posts/Hello/index.md")
        );
        assert_eq!(
            Layout::Bundle.artifact_path(root, "Hello"),
            PathBuf::from("/site/it/posts/Hello")
        );
    }

    #[test]
    fn test_identity_of() {
        assert_eq!(
            identity_of(Path::new("vault/My Post.md"), Layout::Flat).as_deref(),
            Some("My Post")
        );
        assert_eq!(
            identity_of(Path::new("vault/My Post/index.md"), Layout::Bundle).as_deref(),
            Some("My Post")
        );
    }

    #[test]
    fn test_identity_is_nfc() {
        // "e" + combining acute accent vs precomposed "é"
        assert_eq!(identity("Caffe\u{301}"), identity("Caff\u{e9}"));
    }

    #[test]
    fn test_load_and_entry_name() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("Trip");
        std::fs::create_dir(&bundle).unwrap();
        let path = bundle.join(BUNDLE_INDEX);
        std::fs::write(&path, "---\ndraft: true\n---\nBody").unwrap();

        let doc = Document::load(&path, Layout::Bundle).unwrap();
        assert_eq!(doc.id, "Trip");
        assert_eq!(doc.entry_name(), "Trip");
        assert_eq!(doc.bundle_dir(), Some(bundle.as_path()));
        assert_eq!(doc.body(), "Body");
        assert!(doc.frontmatter().unwrap().is_some());

        let flat = dir.path().join("Note.md");
        std::fs::write(&flat, "plain").unwrap();
        let doc = Document::load(&flat, Layout::Flat).unwrap();
        assert_eq!(doc.entry_name(), "Note.md");
        assert!(doc.bundle_dir().is_none());
    }

    #[test]
    fn test_load_missing_is_io_failure() {
        let result = Document::load(Path::new("/nope/Gone.md"), Layout::Flat);
        assert!(matches!(result, Err(SyncError::IoFailure { .. })));
    }
}
