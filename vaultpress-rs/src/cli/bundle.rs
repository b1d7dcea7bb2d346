//! Bundle command.

use crate::bundle::convert_to_bundles;
use crate::cli::args::BundleArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};

pub fn run(args: &BundleArgs, output: &Output) -> Result<ExitCode> {
    let report = convert_to_bundles(&args.dir)?;
    output.print(&report)?;
    if report.failures() > 0 {
        Ok(ExitCode::DocumentFailures)
    } else {
        Ok(ExitCode::Success)
    }
}
