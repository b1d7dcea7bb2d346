//! Inspect command: how one document would be classified and published.

use crate::classify::{
    declared_language, detectable_text, is_draft, Classifier, LanguageDetector, Verdict, WhatlangDetector,
};
use crate::cli::args::InspectArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::document::{Document, Layout, BUNDLE_INDEX};
use crate::error::{ExitCode, Result, SyncError};
use crate::parser::parse_image_embeds;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Output for the inspect command.
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub id: String,
    pub path: String,
    pub layout: Layout,
    pub entry_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontmatter_error: Option<String>,
    pub draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
    pub prose_chars: usize,
    pub verdict: Verdict,
    pub images: Vec<String>,
}

/// Markdown path and layout for a file or bundle directory argument.
fn locate(path: &Path) -> Result<(PathBuf, Layout)> {
    if path.is_dir() {
        let index = path.join(BUNDLE_INDEX);
        if index.is_file() {
            return Ok((index, Layout::Bundle));
        }
        return Err(SyncError::DocumentNotFound(index));
    }
    if !path.is_file() {
        return Err(SyncError::DocumentNotFound(path.to_path_buf()));
    }
    let layout = if path.file_name().is_some_and(|n| n == BUNDLE_INDEX) {
        Layout::Bundle
    } else {
        Layout::Flat
    };
    Ok((path.to_path_buf(), layout))
}

pub fn run(config: &Config, args: &InspectArgs, output: &Output) -> Result<ExitCode> {
    let (path, layout) = locate(&args.path)?;
    let document = Document::load(&path, layout)?;

    let (frontmatter, frontmatter_error) = match document.frontmatter() {
        Ok(fm) => (fm, None),
        Err(e) => (None, Some(e.to_string())),
    };

    let prose = detectable_text(&document.content);
    let prose_chars = prose.chars().count();
    let detected_language = if prose_chars >= config.min_detect_chars {
        WhatlangDetector.detect(&prose).ok()
    } else {
        None
    };

    let verdict = config
        .classifier()
        .classify(frontmatter.as_ref(), &document.content);

    let mut images: Vec<String> = frontmatter
        .iter()
        .flat_map(|fm| config.image_fields.iter().filter_map(|f| fm.get_str(f)))
        .map(str::to_string)
        .collect();
    images.extend(parse_image_embeds(document.body()).into_iter().map(|e| e.target));

    let result = InspectOutput {
        id: document.id.clone(),
        path: path.to_string_lossy().into_owned(),
        layout,
        entry_name: document.entry_name(),
        frontmatter: frontmatter
            .as_ref()
            .and_then(|fm| serde_json::to_value(&fm.mapping).ok()),
        frontmatter_error,
        draft: is_draft(frontmatter.as_ref()),
        declared_language: declared_language(frontmatter.as_ref()),
        detected_language,
        prose_chars,
        verdict,
        images,
    };

    output.print(&result)?;
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("Trip");
        std::fs::create_dir(&bundle).unwrap();
        std::fs::write(bundle.join(BUNDLE_INDEX), "x").unwrap();
        std::fs::write(dir.path().join("Note.md"), "x").unwrap();

        assert_eq!(locate(&bundle).unwrap(), (bundle.join(BUNDLE_INDEX), Layout::Bundle));
        assert_eq!(
            locate(&bundle.join(BUNDLE_INDEX)).unwrap().1,
            Layout::Bundle
        );
        assert_eq!(locate(&dir.path().join("Note.md")).unwrap().1, Layout::Flat);
        assert!(matches!(
            locate(&dir.path().join("Gone.md")),
            Err(SyncError::DocumentNotFound(_))
        ));
    }
}
