//! Sync and prune commands.

use crate::cli::args::SyncArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::error::{ExitCode, Result, SyncError};
use crate::reconcile::{Reconciler, Report};
use tracing::warn;

/// Reconcile every bucket with the vault.
pub fn sync(config: &Config, args: &SyncArgs, output: &Output) -> Result<ExitCode> {
    run(config, args.dry_run, false, output)
}

/// Apply only the deletions a sync would make.
pub fn prune(config: &Config, args: &SyncArgs, output: &Output) -> Result<ExitCode> {
    run(config, args.dry_run, true, output)
}

fn run(config: &Config, dry_run: bool, prune_only: bool, output: &Output) -> Result<ExitCode> {
    let reconciler = Reconciler::new(config)?;

    let plan = match reconciler.plan() {
        Ok(plan) => plan,
        Err(SyncError::MissingPath(path)) if path == config.source_root => {
            warn!(path = %path.display(), "source root not found, nothing reconciled");
            let mut report = Report::new(dry_run);
            report
                .skipped_phases
                .push(format!("reconcile: source root {} not found", path.display()));
            output.print(&report.finish())?;
            return Ok(ExitCode::Success);
        }
        Err(e) => return Err(e),
    };

    let plan = if prune_only { plan.deletions_only() } else { plan };
    let report = reconciler.apply(&plan, dry_run);
    output.print(&report)?;
    Ok(report.exit_code())
}
