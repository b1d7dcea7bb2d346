//! Run configuration, loaded from TOML.
//!
//! ```toml
//! source_root = "~/vault/08 - Blog"
//! attachment_root = "~/vault/99 - Meta/Clipboard"
//! default_bucket = "italian"
//!
//! [destinations.italian]
//! path = "content/it/posts"
//! languages = ["it"]
//!
//! [destinations.english]
//! path = "content/en/posts"
//! languages = ["en"]
//! ```

use crate::classify::{
    Classifier, DraftFilter, LanguageClassifier, SingleBucket, WhatlangDetector,
    DEFAULT_MIN_DETECT_CHARS,
};
use crate::document::Layout;
use crate::error::{Result, SyncError};
use crate::freshness::{AlwaysStale, Freshness, Mtime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "vaultpress.toml";

/// How included documents are split across destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyBy {
    /// Declared or detected language.
    #[default]
    Language,
    /// Everything goes into the default bucket.
    Single,
}

/// One destination bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    /// Directory holding this bucket's documents.
    pub path: PathBuf,
    /// Language codes routed here. Empty means the bucket name itself.
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Configuration for a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Vault directory holding the authoritative documents.
    pub source_root: PathBuf,

    /// Flat directory of attachments referenced by name.
    #[serde(default)]
    pub attachment_root: Option<PathBuf>,

    /// Bucket name to destination.
    pub destinations: BTreeMap<String, DestinationConfig>,

    /// Bucket for documents whose language is unknown.
    #[serde(default)]
    pub default_bucket: String,

    /// Only rewrite destination documents older than their source.
    #[serde(default = "default_true")]
    pub mtime_comparison: bool,

    /// Layout written at the destination.
    #[serde(default)]
    pub layout: Layout,

    #[serde(default)]
    pub classify_by: ClassifyBy,

    /// Exclusion manifest shared with external copy tools.
    #[serde(default)]
    pub exclude_file: Option<PathBuf>,

    /// Generated site output to purge when a document is deleted.
    #[serde(default)]
    pub public_root: Option<PathBuf>,

    /// Frontmatter fields naming a cover image, in precedence order.
    #[serde(default = "default_image_fields")]
    pub image_fields: Vec<String>,

    #[serde(default = "default_min_detect_chars")]
    pub min_detect_chars: usize,
}

fn default_true() -> bool {
    true
}

fn default_image_fields() -> Vec<String> {
    vec!["image".to_string(), "cover".to_string()]
}

fn default_min_detect_chars() -> usize {
    DEFAULT_MIN_DETECT_CHARS
}

impl Config {
    /// Load configuration.
    ///
    /// Lookup order: `explicit`, then `./vaultpress.toml`, then
    /// `<config dir>/vaultpress/config.toml`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(SyncError::MissingPath(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(&local);
        }

        if let Some(path) = Self::default_path() {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        Err(SyncError::ConfigError(format!(
            "no configuration found; pass --config or create {}",
            LOCAL_CONFIG_FILE
        )))
    }

    /// The per-user configuration file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vaultpress").join("config.toml"))
    }

    /// Load from a file; relative paths resolve against its directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str, base: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| -> PathBuf {
            let expanded = expand_home(p);
            if expanded.is_absolute() {
                expanded
            } else {
                base.join(expanded)
            }
        };

        self.source_root = resolve(&self.source_root);
        self.attachment_root = self.attachment_root.as_deref().map(resolve);
        self.exclude_file = self.exclude_file.as_deref().map(resolve);
        self.public_root = self.public_root.as_deref().map(resolve);
        for dest in self.destinations.values_mut() {
            dest.path = resolve(&dest.path);
        }
    }

    /// Check invariants and fill in the default bucket when unambiguous.
    pub fn validate(&mut self) -> Result<()> {
        if self.destinations.is_empty() {
            return Err(SyncError::ConfigError(
                "at least one destination is required".to_string(),
            ));
        }

        if self.default_bucket.is_empty() {
            if self.destinations.len() == 1 {
                self.default_bucket = self.destinations.keys().next().cloned().unwrap_or_default();
            } else {
                return Err(SyncError::ConfigError(
                    "default_bucket is required with more than one destination".to_string(),
                ));
            }
        }

        if !self.destinations.contains_key(&self.default_bucket) {
            return Err(SyncError::ConfigError(format!(
                "default_bucket '{}' is not a destination",
                self.default_bucket
            )));
        }

        let mut seen = BTreeMap::new();
        for (code, bucket) in self.language_map() {
            if let Some(other) = seen.insert(code.clone(), bucket.clone()) {
                if other != bucket {
                    return Err(SyncError::ConfigError(format!(
                        "language '{}' is routed to both '{}' and '{}'",
                        code, other, bucket
                    )));
                }
            }
        }

        Ok(())
    }

    /// Override the source root (from the command line).
    pub fn with_source_root(mut self, root: Option<&Path>) -> Self {
        if let Some(root) = root {
            self.source_root = root.to_path_buf();
        }
        self
    }

    /// Path of a bucket's destination directory.
    pub fn bucket_path(&self, bucket: &str) -> Option<&Path> {
        self.destinations.get(bucket).map(|d| d.path.as_path())
    }

    /// Language code to bucket name, as pairs.
    pub fn language_map(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (bucket, dest) in &self.destinations {
            if dest.languages.is_empty() {
                pairs.push((bucket.to_lowercase(), bucket.clone()));
            } else {
                for code in &dest.languages {
                    pairs.push((code.to_lowercase(), bucket.clone()));
                }
            }
        }
        pairs
    }

    /// Build the classifier this configuration describes.
    pub fn classifier(&self) -> Box<dyn Classifier> {
        match self.classify_by {
            ClassifyBy::Single => Box::new(DraftFilter::new(SingleBucket(
                self.default_bucket.clone(),
            ))),
            ClassifyBy::Language => Box::new(DraftFilter::new(
                LanguageClassifier::new(
                    self.language_map().into_iter().collect(),
                    self.default_bucket.clone(),
                    WhatlangDetector,
                )
                .with_min_detect_chars(self.min_detect_chars),
            )),
        }
    }

    /// Build the staleness comparator this configuration describes.
    pub fn freshness(&self) -> Box<dyn Freshness> {
        if self.mtime_comparison {
            Box::new(Mtime)
        } else {
            Box::new(AlwaysStale)
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
