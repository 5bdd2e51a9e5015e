//! Result and report types returned to the host.
//!
//! Every engine entry point hands back a serializable report with grouped
//! entity ids, outcome counters, and a human-readable `summary()` line the
//! host can display verbatim. Validation no-ops (too few entities, too few
//! names) are reports with a note, never errors.

use serde::Serialize;

use crate::core::errors::Result;
use crate::core::scene::EntityId;

pub use crate::rules::engine::{RuleOutcome, RuleRunReport, RuleStatus};

/// Result of a proximity clustering pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterReport {
    /// The cluster partition: every considered entity appears in exactly one
    /// group
    pub clusters: Vec<Vec<EntityId>>,
    /// Entities considered after filtering out mesh-less ones
    pub considered: usize,
    /// Informational skip note, set when the pass did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ClusterReport {
    /// Number of clusters with at least 2 members.
    pub fn mergeable(&self) -> usize {
        self.clusters.iter().filter(|c| c.len() > 1).count()
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        match &self.note {
            Some(note) => note.clone(),
            None => format!(
                "Found {} clusters ({} mergeable) across {} entities.",
                self.clusters.len(),
                self.mergeable(),
                self.considered
            ),
        }
    }

    /// Serialize the report to JSON for host display layers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

/// Result of a proximity join pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProximityJoinReport {
    /// Total clusters found
    pub clusters: usize,
    /// Clusters of size >= 2 that were merged
    pub joined: usize,
    /// Entities merged away into join survivors
    pub entities_merged: usize,
    /// Informational skip note, set when the pass did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ProximityJoinReport {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        match &self.note {
            Some(note) => note.clone(),
            None => format!("Joined {} clusters.", self.joined),
        }
    }

    /// Serialize the report to JSON for host display layers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

/// Result of a duplicate detection or instance linking pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupeReport {
    /// Entity groups sharing a fingerprint, first-seen order; the first
    /// member of each group is the link primary
    pub groups: Vec<Vec<EntityId>>,
    /// Entities beyond the first in multi-member groups
    pub duplicates: usize,
    /// Entities whose geometry reference was redirected (zero for a
    /// detection-only pass)
    pub relinked: usize,
    /// Informational skip note, set when the pass did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DedupeReport {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        match &self.note {
            Some(note) => note.clone(),
            None if self.relinked > 0 => format!(
                "Linked {} duplicate entities across {} groups.",
                self.relinked,
                self.groups.iter().filter(|g| g.len() > 1).count()
            ),
            None => format!("Found {} duplicate entities.", self.duplicates),
        }
    }

    /// Serialize the report to JSON for host display layers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

/// Result of a pattern detection pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternReport {
    /// Inferred patterns, deduplicated and sorted ascending by length
    pub patterns: Vec<String>,
    /// Names analyzed
    pub names_analyzed: usize,
    /// Informational skip note, set when the pass did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PatternReport {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        match &self.note {
            Some(note) => note.clone(),
            None => format!("Found {} patterns.", self.patterns.len()),
        }
    }

    /// Serialize the report to JSON for host display layers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}
