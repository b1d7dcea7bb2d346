//! Diagnostic logging to stderr via `tracing`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level directive for the given `-v` count. `quiet` wins over verbosity.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the global subscriber. `RUST_LOG` overrides the level derived
/// from the flags. Calling this twice is harmless.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose >= 3)
        .with_level(true)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, warn};

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0, false), "warn");
        assert_eq!(level_for(1, false), "info");
        assert_eq!(level_for(2, false), "debug");
        assert_eq!(level_for(7, false), "trace");
        assert_eq!(level_for(3, true), "error");
    }

    #[test]
    fn test_init_twice() {
        init(1, false);
        init(2, false);
        info!("still logging");
        warn!("after a second init");
    }
}
