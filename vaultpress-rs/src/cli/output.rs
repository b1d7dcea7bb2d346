//! Output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::error::Result;
use serde::Serialize;

/// Helper for formatting and printing command results to stdout.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Render a serializable value in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Toml => toml::to_string_pretty(value)?,
        })
    }

    /// Print a serializable value in the configured format.
    pub fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }

    /// Print an error message to stderr, unless quiet.
    pub fn error(&self, message: &str) {
        if !self.quiet {
            eprintln!("Error: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Counts {
        created: usize,
        deleted: usize,
    }

    #[test]
    fn test_render_formats() {
        let value = Counts { created: 2, deleted: 1 };

        let json = Output::new(OutputFormat::Json, false).render(&value).unwrap();
        assert!(json.contains("\"created\": 2"));

        let yaml = Output::new(OutputFormat::Yaml, false).render(&value).unwrap();
        assert!(yaml.contains("deleted: 1"));

        let toml = Output::new(OutputFormat::Toml, true).render(&value).unwrap();
        assert!(toml.contains("created = 2"));
    }
}
