//! Executing a plan against the filesystem and reporting what happened.

use super::attachments::{copy_if_newer, render, AttachmentResolver, Rendered};
use super::plan::{Action, Classified, DeleteReason, Plan};
use crate::config::Config;
use crate::document::{Layout, BUNDLE_INDEX};
use crate::error::{ExitCode, Result, SyncError};
use crate::tree::Placement;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// How one action turned out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Done,
    /// Dry run: nothing was touched.
    Planned,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: String,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// A non-fatal problem tied to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub moved: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The result of a reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub summary: Summary,
    pub entries: Vec<Entry>,
    pub warnings: Vec<Notice>,
    /// Phases that were not run, with the reason.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_phases: Vec<String>,
}

impl Report {
    pub fn new(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            dry_run,
            summary: Summary::default(),
            entries: Vec::new(),
            warnings: Vec::new(),
            skipped_phases: Vec::new(),
        }
    }

    fn record(&mut self, action: &Action, outcome: Outcome) {
        match &outcome {
            Outcome::Failed { .. } => self.summary.failed += 1,
            Outcome::Skipped { .. } => self.summary.skipped += 1,
            Outcome::Done | Outcome::Planned => match action {
                Action::Create { .. } => self.summary.created += 1,
                Action::Update { .. } => self.summary.updated += 1,
                Action::Move { .. } => self.summary.moved += 1,
                Action::Delete { .. } => self.summary.deleted += 1,
                Action::Skip { .. } => self.summary.skipped += 1,
            },
        }
        self.entries.push(Entry {
            id: action.id().to_string(),
            action: action.kind(),
            bucket: action.bucket().map(str::to_string),
            outcome,
        });
    }

    pub fn warn(&mut self, id: &str, message: impl Into<String>) {
        self.warnings.push(Notice {
            id: id.to_string(),
            message: message.into(),
        });
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.has_failures() {
            ExitCode::DocumentFailures
        } else {
            ExitCode::Success
        }
    }
}

/// Atomic write: write to a hidden temp file beside `path`, then rename.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| SyncError::Other(format!("{} has no parent directory", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.{}.tmp", name, std::process::id()));

    fs::write(&temp_path, contents).map_err(|e| SyncError::io(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        SyncError::io(path, e)
    })
}

/// Remove a file or directory. Returns false if it was already gone.
pub fn remove_artifact(path: &Path) -> Result<bool> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

/// The URL slug a site generator derives from an identity.
pub fn public_slug(id: &str) -> String {
    id.to_lowercase().replace(' ', "-")
}

/// Copy a bundle's non-markdown siblings into `dest`, recursively. Files in
/// `renamed` were already published under another name and are skipped.
fn copy_siblings(src: &Path, dest: &Path, renamed: &[PathBuf]) -> Result<()> {
    for entry in fs::read_dir(src).map_err(|e| SyncError::io(src, e))? {
        let entry = entry.map_err(|e| SyncError::io(src, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == BUNDLE_INDEX {
            continue;
        }

        let path = entry.path();
        let target = dest.join(&*name);
        if path.is_dir() {
            fs::create_dir_all(&target).map_err(|e| SyncError::io(&target, e))?;
            copy_siblings(&path, &target, renamed)?;
        } else if renamed.contains(&path) {
            continue;
        } else if copy_if_newer(&path, &target)? {
            debug!(file = %target.display(), "copied bundle file");
        }
    }
    Ok(())
}

/// Applies plans for one configuration.
pub struct Applier<'a> {
    config: &'a Config,
    resolver: AttachmentResolver,
    dry_run: bool,
}

impl<'a> Applier<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            resolver: AttachmentResolver::new(config.attachment_root.as_deref()),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply every action in order. A failing action is recorded and the
    /// run continues with the next one.
    pub fn apply(&self, plan: &Plan) -> Report {
        let mut report = Report::new(self.dry_run);

        for action in &plan.actions {
            let outcome = match action {
                Action::Skip { reason, .. } => Outcome::Skipped {
                    reason: reason.clone(),
                },
                _ if self.dry_run => {
                    info!(document = action.id(), action = action.kind(), bucket = ?action.bucket(), "would apply");
                    Outcome::Planned
                }
                _ => match self.apply_action(action, plan, &mut report) {
                    Ok(()) => Outcome::Done,
                    Err(e) => {
                        error!(document = action.id(), action = action.kind(), error = %e, "action failed");
                        Outcome::Failed {
                            error: e.to_string(),
                        }
                    }
                },
            };
            report.record(action, outcome);
        }

        report.finish()
    }

    fn apply_action(&self, action: &Action, plan: &Plan, report: &mut Report) -> Result<()> {
        match action {
            Action::Create { id, bucket } | Action::Update { id, bucket } => {
                let source = self.source(plan, id)?;
                let rendered = self.publish(source, bucket)?;
                note_missing(report, id, &rendered);
                info!(document = %id, bucket = %bucket, action = action.kind(), "published");
            }
            Action::Move { id, from, to } => {
                let source = self.source(plan, id)?;
                let rendered = self.publish(source, to)?;
                note_missing(report, id, &rendered);

                let written = self.artifact_path(to, id)?;
                if from.path != written {
                    remove_artifact(&from.path)?;
                }
                info!(document = %id, from = %from.bucket, to = %to, "moved");
            }
            Action::Delete {
                id,
                placement,
                reason,
            } => {
                self.delete(id, placement, *reason, report)?;
            }
            Action::Skip { .. } => {}
        }
        Ok(())
    }

    fn source<'p>(&self, plan: &'p Plan, id: &str) -> Result<&'p Classified> {
        plan.sources
            .get(id)
            .ok_or_else(|| SyncError::Other(format!("no source document for '{}'", id)))
    }

    fn artifact_path(&self, bucket: &str, id: &str) -> Result<PathBuf> {
        let root = self
            .config
            .bucket_path(bucket)
            .ok_or_else(|| SyncError::ConfigError(format!("unknown bucket '{}'", bucket)))?;
        Ok(self.config.layout.artifact_path(root, id))
    }

    /// Write the rendered document into `bucket`, stamped with the source's
    /// modification time.
    fn publish(&self, source: &Classified, bucket: &str) -> Result<Rendered> {
        let document = &source.document;
        let root = self
            .config
            .bucket_path(bucket)
            .ok_or_else(|| SyncError::ConfigError(format!("unknown bucket '{}'", bucket)))?;
        let layout = self.config.layout;
        let markdown = layout.markdown_path(root, &document.id);
        let dir = markdown.parent().unwrap_or(root);
        fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;

        let resolver = match document.bundle_dir() {
            Some(bundle) => self.resolver.clone().with_first(bundle),
            None => self.resolver.clone(),
        };

        let rendered = render(
            &document.content,
            source.frontmatter.as_ref(),
            &self.config.image_fields,
            &resolver,
            dir,
        )?;

        if let (Some(bundle), Layout::Bundle) = (document.bundle_dir(), layout) {
            copy_siblings(bundle, dir, &rendered.renamed)?;
        }

        atomic_write(&markdown, rendered.content.as_bytes())?;
        document.stamp.apply_to(&markdown)?;
        Ok(rendered)
    }

    fn delete(&self, id: &str, placement: &Placement, reason: DeleteReason, report: &mut Report) -> Result<()> {
        if !remove_artifact(&placement.path)? {
            debug!(document = %id, path = %placement.path.display(), "already gone");
        }
        info!(document = %id, bucket = %placement.bucket, reason = ?reason, "deleted");

        if reason == DeleteReason::Duplicate {
            return Ok(());
        }
        if let Some(public_root) = &self.config.public_root {
            let generated = public_root.join(public_slug(id));
            if generated.is_dir() {
                match fs::remove_dir_all(&generated) {
                    Ok(()) => debug!(path = %generated.display(), "purged generated output"),
                    Err(e) => {
                        warn!(path = %generated.display(), error = %e, "cannot purge generated output");
                        report.warn(id, format!("cannot purge {}: {}", generated.display(), e));
                    }
                }
            }
        }
        Ok(())
    }
}

fn note_missing(report: &mut Report, id: &str, rendered: &Rendered) {
    for name in &rendered.missing {
        report.warn(id, format!("attachment not found: {}", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.md");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_remove_artifact() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("Post");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("index.md"), "x").unwrap();

        assert!(remove_artifact(&bundle).unwrap());
        assert!(!bundle.exists());
        assert!(!remove_artifact(&bundle).unwrap());
    }

    #[test]
    fn test_public_slug() {
        assert_eq!(public_slug("My First Post"), "my-first-post");
    }

    #[test]
    fn test_report_counts_and_exit_code() {
        let mut report = Report::new(false);
        let create = Action::Create {
            id: "A".into(),
            bucket: "it".into(),
        };
        report.record(&create, Outcome::Done);
        assert_eq!(report.exit_code(), ExitCode::Success);

        report.record(&create, Outcome::Failed { error: "disk full".into() });
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.exit_code(), ExitCode::DocumentFailures);
    }

    #[test]
    fn test_entry_serializes_flat() {
        let mut report = Report::new(true);
        report.record(
            &Action::Skip {
                id: "B".into(),
                reason: "unreadable".into(),
            },
            Outcome::Skipped {
                reason: "unreadable".into(),
            },
        );
        let json = serde_json::to_value(&report.entries[0]).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["action"], "skip");
        assert!(json.get("bucket").is_none());
    }
}
