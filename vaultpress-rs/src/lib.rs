//! Vaultpress - one-way publishing of an Obsidian vault folder into
//! static-site content directories.
//!
//! # Overview
//!
//! Every run reconciles the destination with the vault:
//! - drafts and documents removed from the vault are deleted at the destination
//! - new and changed documents are written into the bucket for their language
//! - documents whose language changed are moved between buckets
//! - referenced images are copied next to the published document and their
//!   Obsidian embeds rewritten to plain markdown
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use vaultpress::{Config, Reconciler};
//!
//! let config = Config::load(Some(Path::new("vaultpress.toml"))).unwrap();
//! let reconciler = Reconciler::new(&config).unwrap();
//!
//! let plan = reconciler.plan().unwrap();
//! for action in plan.changes() {
//!     println!("{} {}", action.kind(), action.id());
//! }
//!
//! let report = reconciler.apply(&plan, false);
//! println!("{} failed", report.summary.failed);
//! ```

pub mod bundle;
pub mod classify;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod freshness;
pub mod logging;
pub mod manifest;
pub mod parser;
pub mod reconcile;
pub mod tree;

// Re-export main types at crate root
pub use classify::{Classifier, Verdict};
pub use config::Config;
pub use document::{Document, Layout};
pub use error::{Result, SyncError};
pub use freshness::{FileStamp, Freshness};
pub use manifest::Manifest;
pub use reconcile::{Action, Plan, Reconciler, Report};
pub use tree::{DestinationState, SourceTree};
