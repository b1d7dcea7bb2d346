//! Images command: refresh image references in published bundles.

use crate::cli::args::ImagesArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::document::Layout;
use crate::error::{ExitCode, Result, SyncError};
use crate::reconcile::{refresh_in_place, AttachmentResolver, Notice};
use crate::tree::DestinationState;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Default, Serialize)]
pub struct ImagesOutput {
    pub processed: usize,
    pub rewritten: Vec<String>,
    pub copied: usize,
    pub warnings: Vec<Notice>,
    pub failures: Vec<Notice>,
}

pub fn run(config: &Config, args: &ImagesArgs, output: &Output) -> Result<ExitCode> {
    if let Some(bucket) = &args.bucket {
        if config.bucket_path(bucket).is_none() {
            return Err(SyncError::ConfigError(format!("unknown bucket '{}'", bucket)));
        }
    }

    let state = DestinationState::scan(config)?;
    let resolver = AttachmentResolver::new(config.attachment_root.as_deref());
    let mut result = ImagesOutput::default();

    for id in state.ids() {
        for placement in state.get(id) {
            if placement.layout != Layout::Bundle {
                continue;
            }
            if args.bucket.as_ref().is_some_and(|b| b != &placement.bucket) {
                continue;
            }

            result.processed += 1;
            let markdown = placement.markdown_path();
            match refresh_in_place(&markdown, &config.image_fields, &resolver) {
                Ok(refreshed) => {
                    if refreshed.rewritten {
                        result.rewritten.push(id.to_string());
                    }
                    result.copied += refreshed.rendered.copied.len();
                    for name in refreshed.rendered.missing {
                        result.warnings.push(Notice {
                            id: id.to_string(),
                            message: format!("attachment not found: {}", name),
                        });
                    }
                }
                Err(e) => {
                    error!(document = id, error = %e, "cannot process images");
                    result.failures.push(Notice {
                        id: id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    let code = if result.failures.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::DocumentFailures
    };
    output.print(&result)?;
    Ok(code)
}
