//! Computing the action list that converges the destination onto the source.

use crate::classify::{Classifier, Verdict};
use crate::document::{Document, Layout};
use crate::freshness::Freshness;
use crate::manifest::Manifest;
use crate::parser::FrontMatter;
use crate::tree::{DestinationState, Placement, SourceEntry};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Why a destination artifact is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteReason {
    /// The source is a draft or listed in the exclusion manifest.
    Excluded,
    /// The source no longer exists.
    Removed,
    /// A second copy of a document that already has a home.
    Duplicate,
}

/// One step of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Create {
        id: String,
        bucket: String,
    },
    Update {
        id: String,
        bucket: String,
    },
    /// Write into `to`, then remove `from` once the write succeeded.
    Move {
        id: String,
        from: Placement,
        to: String,
    },
    Delete {
        id: String,
        placement: Placement,
        reason: DeleteReason,
    },
    /// The source was left out of this run; its destination copies are left
    /// alone.
    Skip {
        id: String,
        reason: String,
    },
}

impl Action {
    pub fn id(&self) -> &str {
        match self {
            Action::Create { id, .. }
            | Action::Update { id, .. }
            | Action::Move { id, .. }
            | Action::Delete { id, .. }
            | Action::Skip { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Update { .. } => "update",
            Action::Move { .. } => "move",
            Action::Delete { .. } => "delete",
            Action::Skip { .. } => "skip",
        }
    }

    /// The bucket the action writes to or removes from.
    pub fn bucket(&self) -> Option<&str> {
        match self {
            Action::Create { bucket, .. } | Action::Update { bucket, .. } => Some(bucket),
            Action::Move { to, .. } => Some(to),
            Action::Delete { placement, .. } => Some(&placement.bucket),
            Action::Skip { .. } => None,
        }
    }

    /// Application order: deletions, then writes, then moves.
    fn phase(&self) -> u8 {
        match self {
            Action::Delete { .. } => 0,
            Action::Create { .. } | Action::Update { .. } => 1,
            Action::Move { .. } => 2,
            Action::Skip { .. } => 3,
        }
    }

    /// Whether applying this action touches the filesystem.
    pub fn is_change(&self) -> bool {
        !matches!(self, Action::Skip { .. })
    }
}

/// A readable source document with its classification.
#[derive(Debug, Clone)]
pub struct Classified {
    pub document: Document,
    pub frontmatter: Option<FrontMatter>,
    pub verdict: Verdict,
}

/// The ordered actions of one pass, plus the source documents they write.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub actions: Vec<Action>,
    pub sources: BTreeMap<String, Classified>,
}

impl Plan {
    /// True when applying the plan would change nothing. `Skip` entries are
    /// informational and do not count.
    pub fn is_empty(&self) -> bool {
        !self.actions.iter().any(Action::is_change)
    }

    pub fn changes(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.is_change())
    }

    /// Keep only deletions, for pruning without publishing.
    pub fn deletions_only(mut self) -> Self {
        self.actions.retain(|a| matches!(a, Action::Delete { .. }));
        self
    }
}

/// Inputs to planning that stay fixed for a run.
pub struct Planner<'a> {
    pub classifier: &'a dyn Classifier,
    pub freshness: &'a dyn Freshness,
    pub layout: Layout,
    pub manifest: Option<&'a Manifest>,
}

impl Planner<'_> {
    /// Classify one document. Unusable frontmatter is treated as empty.
    pub fn classify(&self, document: Document) -> Classified {
        let frontmatter = match document.frontmatter() {
            Ok(fm) => fm,
            Err(e) => {
                warn!(document = %document.id, error = %e, "unusable frontmatter, treating as empty");
                None
            }
        };

        let listed = self
            .manifest
            .is_some_and(|m| m.contains(&document.entry_name()));
        let verdict = if listed {
            Verdict::Excluded
        } else {
            self.classifier.classify(frontmatter.as_ref(), &document.content)
        };

        Classified {
            document,
            frontmatter,
            verdict,
        }
    }

    /// Compare the source against the destination and order the result.
    pub fn plan(&self, entries: Vec<SourceEntry>, state: &DestinationState) -> Plan {
        let mut actions = Vec::new();
        let mut sources = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for entry in entries {
            seen.insert(entry.id().to_string());
            match entry {
                SourceEntry::Unreadable(skipped) | SourceEntry::Shadowed(skipped) => {
                    actions.push(Action::Skip {
                        id: skipped.id,
                        reason: skipped.reason,
                    });
                }
                SourceEntry::Document(document) => {
                    let classified = self.classify(document);
                    let id = classified.document.id.clone();
                    self.plan_document(&classified, state.get(&id), &mut actions);
                    sources.insert(id, classified);
                }
            }
        }

        for id in state.ids() {
            if seen.contains(id) {
                continue;
            }
            for placement in state.get(id) {
                actions.push(Action::Delete {
                    id: id.to_string(),
                    placement: placement.clone(),
                    reason: DeleteReason::Removed,
                });
            }
        }

        actions.sort_by(|a, b| {
            (a.phase(), a.id(), a.bucket()).cmp(&(b.phase(), b.id(), b.bucket()))
        });

        Plan { actions, sources }
    }

    fn plan_document(&self, classified: &Classified, placements: &[Placement], actions: &mut Vec<Action>) {
        let id = &classified.document.id;

        let bucket = match &classified.verdict {
            Verdict::Excluded => {
                debug!(document = %id, "excluded");
                for placement in placements {
                    actions.push(Action::Delete {
                        id: id.clone(),
                        placement: placement.clone(),
                        reason: DeleteReason::Excluded,
                    });
                }
                return;
            }
            Verdict::Include(bucket) => bucket,
        };

        let home = placements
            .iter()
            .position(|p| &p.bucket == bucket && p.layout == self.layout);

        let mut rest: Vec<&Placement> = placements
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != home)
            .map(|(_, p)| p)
            .collect();

        match home {
            Some(i) => {
                if self.freshness.is_newer(&classified.document.stamp, &placements[i].stamp) {
                    actions.push(Action::Update {
                        id: id.clone(),
                        bucket: bucket.clone(),
                    });
                }
            }
            None if !rest.is_empty() => {
                let from = rest.remove(0);
                actions.push(Action::Move {
                    id: id.clone(),
                    from: from.clone(),
                    to: bucket.clone(),
                });
            }
            None => actions.push(Action::Create {
                id: id.clone(),
                bucket: bucket.clone(),
            }),
        }

        for placement in rest {
            actions.push(Action::Delete {
                id: id.clone(),
                placement: placement.clone(),
                reason: DeleteReason::Duplicate,
            });
        }
    }
}
