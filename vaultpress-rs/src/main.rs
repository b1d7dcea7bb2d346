//! Vaultpress CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use vaultpress::cli::args::{Cli, Commands};
use vaultpress::cli::output::Output;
use vaultpress::cli::{bundle, exclude, images, inspect, sync};
use vaultpress::config::Config;
use vaultpress::error::{ExitCode as SyncExitCode, SyncError};
use vaultpress::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);
    let output = Output::new(cli.output_format(), cli.quiet);

    match run(&cli, &output) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            output.error(&e.to_string());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli, output: &Output) -> Result<SyncExitCode, SyncError> {
    // Bundling works on any directory and needs no configuration.
    if let Commands::Bundle(args) = &cli.command {
        return bundle::run(args, output);
    }

    let config = Config::load(cli.config.as_deref())?.with_source_root(cli.source.as_deref());

    match &cli.command {
        Commands::Sync(args) => sync::sync(&config, args, output),
        Commands::Prune(args) => sync::prune(&config, args, output),
        Commands::Exclude(args) => exclude::run(&config, args, output),
        Commands::Images(args) => images::run(&config, args, output),
        Commands::Inspect(args) => inspect::run(&config, args, output),
        Commands::Bundle(args) => bundle::run(args, output),
    }
}
