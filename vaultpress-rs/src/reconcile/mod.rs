//! One-way reconciliation of the vault into the destination buckets.
//!
//! A run scans both sides, plans the actions that make the destination match
//! the source, and applies them. Planning is pure; only [`Applier`] touches
//! the filesystem.

pub mod apply;
pub mod attachments;
pub mod plan;

pub use apply::{atomic_write, public_slug, remove_artifact, Applier, Entry, Notice, Outcome, Report, Summary};
pub use attachments::{copy_if_newer, refresh_in_place, render, AttachmentResolver, Refreshed, Rendered};
pub use plan::{Action, Classified, DeleteReason, Plan, Planner};

use crate::classify::Classifier;
use crate::config::Config;
use crate::error::Result;
use crate::freshness::Freshness;
use crate::manifest::Manifest;
use crate::tree::{DestinationState, SourceTree};
use tracing::{debug, info};

/// Ties a configuration to the classifier and comparator it describes.
pub struct Reconciler<'a> {
    config: &'a Config,
    classifier: Box<dyn Classifier>,
    freshness: Box<dyn Freshness>,
    manifest: Option<Manifest>,
}

impl<'a> Reconciler<'a> {
    /// Build a reconciler, reading the exclusion manifest if one is configured.
    pub fn new(config: &'a Config) -> Result<Self> {
        let manifest = match &config.exclude_file {
            Some(path) => Manifest::read(path)?,
            None => None,
        };
        if let Some(m) = &manifest {
            debug!(entries = m.len(), "exclusion manifest loaded");
        }

        Ok(Self {
            config,
            classifier: config.classifier(),
            freshness: config.freshness(),
            manifest,
        })
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_freshness(mut self, freshness: Box<dyn Freshness>) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn planner(&self) -> Planner<'_> {
        Planner {
            classifier: self.classifier.as_ref(),
            freshness: self.freshness.as_ref(),
            layout: self.config.layout,
            manifest: self.manifest.as_ref(),
        }
    }

    /// Scan both trees and compute the plan.
    ///
    /// Fails with `MissingPath` when the source root does not exist, so that a
    /// vanished vault never turns into a mass deletion.
    pub fn plan(&self) -> Result<Plan> {
        let source = SourceTree::open(&self.config.source_root)?;
        let entries = source.scan()?;
        let state = DestinationState::scan(self.config)?;
        debug!(sources = entries.len(), destination = state.len(), "scanned");

        let plan = self.planner().plan(entries, &state);
        info!(changes = plan.changes().count(), "planned");
        Ok(plan)
    }

    pub fn apply(&self, plan: &Plan, dry_run: bool) -> Report {
        Applier::new(self.config).dry_run(dry_run).apply(plan)
    }

    /// Plan and apply in one go.
    pub fn run(&self, dry_run: bool) -> Result<Report> {
        let plan = self.plan()?;
        Ok(self.apply(&plan, dry_run))
    }
}
