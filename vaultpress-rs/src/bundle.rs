//! Converting flat `X.md` files into `X/index.md` bundles in place.

use crate::classify::is_draft;
use crate::document::BUNDLE_INDEX;
use crate::error::{Result, SyncError};
use crate::parser::read_frontmatter;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// What happened to one flat file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Conversion {
    /// Moved into a new bundle.
    Converted,
    /// A bundle with the same name already existed; the file was removed.
    AlreadyBundled,
    /// Drafts are left as files.
    SkippedDraft,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertedFile {
    pub name: String,
    #[serde(flatten)]
    pub conversion: Conversion,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleReport {
    pub converted: usize,
    pub files: Vec<ConvertedFile>,
}

impl BundleReport {
    pub fn failures(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.conversion, Conversion::Failed { .. }))
            .count()
    }
}

fn convert_one(dir: &Path, name: &str) -> Result<Conversion> {
    let path = dir.join(name);
    let content = fs::read_to_string(&path).map_err(|e| SyncError::io(&path, e))?;

    let frontmatter = match read_frontmatter(&content) {
        Ok(fm) => fm,
        Err(e) => {
            warn!(file = name, error = %e, "unusable frontmatter, treating as empty");
            None
        }
    };
    if is_draft(frontmatter.as_ref()) {
        return Ok(Conversion::SkippedDraft);
    }

    let stem = name.trim_end_matches(".md");
    let bundle = dir.join(stem);
    if bundle.exists() {
        fs::remove_file(&path).map_err(|e| SyncError::io(&path, e))?;
        return Ok(Conversion::AlreadyBundled);
    }

    fs::create_dir(&bundle).map_err(|e| SyncError::io(&bundle, e))?;
    let index = bundle.join(BUNDLE_INDEX);
    fs::rename(&path, &index).map_err(|e| SyncError::io(&index, e))?;
    Ok(Conversion::Converted)
}

/// Convert every non-draft `*.md` file directly under `dir` into a bundle.
///
/// Hidden files and `_`-prefixed section files are left alone. A failure on
/// one file is recorded and the rest are still converted.
pub fn convert_to_bundles(dir: &Path) -> Result<BundleReport> {
    if !dir.is_dir() {
        return Err(SyncError::MissingPath(dir.to_path_buf()));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.starts_with('_') || !name.ends_with(".md") {
            continue;
        }
        if entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();

    let mut report = BundleReport::default();
    for name in names {
        let conversion = convert_one(dir, &name).unwrap_or_else(|e| Conversion::Failed {
            error: e.to_string(),
        });
        match &conversion {
            Conversion::Converted => {
                report.converted += 1;
                info!(file = %name, "converted to bundle");
            }
            Conversion::Failed { error } => warn!(file = %name, error = %error, "conversion failed"),
            other => debug!(file = %name, result = ?other, "not converted"),
        }
        report.files.push(ConvertedFile { name, conversion });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn results(report: &BundleReport) -> Vec<(&str, &Conversion)> {
        report
            .files
            .iter()
            .map(|f| (f.name.as_str(), &f.conversion))
            .collect()
    }

    #[test]
    fn test_convert_to_bundles() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("Post.md"), "---\ntitle: P\n---\nBody").unwrap();
        fs::write(root.join("Draft.md"), "---\ndraft: true\n---\n").unwrap();
        fs::write(root.join("Dup.md"), "stale copy").unwrap();
        fs::create_dir(root.join("Dup")).unwrap();
        fs::write(root.join("Dup/index.md"), "bundle").unwrap();
        fs::write(root.join("_index.md"), "section").unwrap();

        let report = convert_to_bundles(root).unwrap();

        assert_eq!(
            results(&report),
            vec![
                ("Draft.md", &Conversion::SkippedDraft),
                ("Dup.md", &Conversion::AlreadyBundled),
                ("Post.md", &Conversion::Converted),
            ]
        );
        assert_eq!(report.converted, 1);
        assert_eq!(fs::read_to_string(root.join("Post/index.md")).unwrap(), "---\ntitle: P\n---\nBody");
        assert!(!root.join("Post.md").exists());
        assert!(!root.join("Dup.md").exists());
        assert_eq!(fs::read_to_string(root.join("Dup/index.md")).unwrap(), "bundle");
        assert!(root.join("Draft.md").exists());
        assert!(root.join("_index.md").exists());
    }

    #[test]
    fn test_missing_dir() {
        let result = convert_to_bundles(Path::new("/no/such/posts"));
        assert!(matches!(result, Err(SyncError::MissingPath(_))));
    }
}
