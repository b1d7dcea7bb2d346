//! Error types and exit codes for vaultpress.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const PATH_NOT_FOUND: i32 = 2;
    pub const INVALID_CONFIG: i32 = 3;
    pub const INVALID_FRONTMATTER: i32 = 5;
    pub const DOCUMENT_FAILURES: i32 = 6;
}

/// Main error type for vaultpress operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid frontmatter in {path}: {message}")]
    InvalidFrontmatter { path: PathBuf, message: String },

    #[error("Path not found: {0}")]
    MissingPath(PathBuf),

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Language classification failed: {0}")]
    ClassificationAmbiguity(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::IoFailure {
            path: path.into(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::MissingPath(_) | SyncError::DocumentNotFound(_) => {
                exit_code::PATH_NOT_FOUND
            }
            SyncError::ConfigError(_) | SyncError::TomlParse(_) => exit_code::INVALID_CONFIG,
            SyncError::InvalidFrontmatter { .. } => exit_code::INVALID_FRONTMATTER,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

/// Result type alias for vaultpress operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    PathNotFound,
    InvalidConfig,
    InvalidFrontmatter,
    DocumentFailures,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::PathNotFound => exit_code::PATH_NOT_FOUND,
            ExitCode::InvalidConfig => exit_code::INVALID_CONFIG,
            ExitCode::InvalidFrontmatter => exit_code::INVALID_FRONTMATTER,
            ExitCode::DocumentFailures => exit_code::DOCUMENT_FAILURES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        assert_eq!(
            SyncError::MissingPath(PathBuf::from("vault")).exit_code(),
            exit_code::PATH_NOT_FOUND
        );
        assert_eq!(
            SyncError::ConfigError("no destinations".into()).exit_code(),
            exit_code::INVALID_CONFIG
        );
        assert_eq!(
            SyncError::Other("boom".into()).exit_code(),
            exit_code::GENERAL_ERROR
        );
    }

    #[test]
    fn test_io_failure_names_path() {
        let err = SyncError::io(
            "posts/A.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("posts/A.md"));
    }
}
