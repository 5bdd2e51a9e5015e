//! Ordered rule application over the scene store.
//!
//! Consumes an ordered list of pattern rules and, for each valid rule,
//! selects working-set entities whose names contain the rule's sample
//! (case-insensitive) and dispatches one of four actions: organize, rename,
//! join, or delete. A per-run used-sample set guards against reapplying the
//! exact same sample string; it compares exact strings only, so distinct but
//! overlapping patterns ("Wall" vs "Wall-INT") are not deduplicated. That is
//! intentional: operators order rules shortest-first instead.
//!
//! There is no rollback. A host-level failure mid-run propagates and leaves
//! mutations from earlier rules applied.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::RulesConfig;
use crate::core::errors::Result;
use crate::core::scene::{EntityId, SceneStore};
use crate::rules::resolver::ContainerResolver;

/// Action a rule performs on its selected entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    /// Move selected entities into the output container
    Organize,
    /// Rename selected entities to `{template}.{ordinal:03}`, then move them
    Rename,
    /// Merge selected entities into one, then move the survivor
    Join,
    /// Permanently remove selected entities
    Delete,
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Organize => "ORGANIZE",
            Self::Rename => "RENAME",
            Self::Join => "JOIN",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A user-authored pattern rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Substring matched case-insensitively against entity names
    pub sample: String,

    /// Action dispatched on the selection
    pub action: RuleAction,

    /// Output container name; falls back to the sample when empty
    #[serde(default)]
    pub output: String,

    /// Explicit parent container for a newly created output container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Rename template; falls back to the effective output name when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_template: Option<String>,
}

impl PatternRule {
    /// Create a rule with the given sample and action.
    pub fn new(sample: impl Into<String>, action: RuleAction) -> Self {
        Self {
            sample: sample.into(),
            action,
            output: String::new(),
            parent: None,
            rename_template: None,
        }
    }

    /// Set the output container name.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Set the explicit parent container name.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the rename template.
    pub fn with_rename_template(mut self, template: impl Into<String>) -> Self {
        self.rename_template = Some(template.into());
        self
    }

    /// The output container name with the empty-name fallback applied.
    pub fn effective_output(&self) -> &str {
        if self.output.is_empty() {
            &self.sample
        } else {
            &self.output
        }
    }
}

/// Per-rule outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleStatus {
    /// The action ran against the selection
    Applied,
    /// Skipped: the sample string was empty
    SkippedEmptySample,
    /// Skipped: the exact sample was consumed earlier in this run
    SkippedDuplicateSample,
    /// Validation no-op (e.g. a JOIN with fewer than 2 entities)
    NoOp,
}

/// Outcome of a single rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    /// Zero-based position in the rule list
    pub index: usize,
    /// The rule's sample string
    pub sample: String,
    /// The rule's action
    pub action: RuleAction,
    /// What happened
    pub status: RuleStatus,
    /// Number of entities the action touched
    pub affected: usize,
    /// Human-readable status line for display
    pub message: String,
}

/// Aggregate result of one rule engine run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleRunReport {
    /// Per-rule outcomes in execution order
    pub outcomes: Vec<RuleOutcome>,
    /// Entities moved into containers
    pub moved: usize,
    /// Entities renamed
    pub renamed: usize,
    /// Entities merged away into a join survivor
    pub merged: usize,
    /// Entities deleted
    pub deleted: usize,
    /// Rules that did not apply: validation skips, dedup-guard skips, and
    /// no-op outcomes
    pub skipped: usize,
}

impl RuleRunReport {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Applied {} of {} rules: {} moved, {} renamed, {} merged, {} deleted, {} skipped.",
            self.outcomes
                .iter()
                .filter(|o| o.status == RuleStatus::Applied)
                .count(),
            self.outcomes.len(),
            self.moved,
            self.renamed,
            self.merged,
            self.deleted,
            self.skipped
        )
    }

    /// Serialize the report to JSON for host display layers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

/// Ordered rule executor.
///
/// Holds no state across invocations; the used-sample guard lives for one
/// [`RuleEngine::run`] call and is discarded at return.
#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    /// Apply every valid rule in order, mutating the store.
    pub fn run(
        store: &mut SceneStore,
        working_set: &[EntityId],
        config: &RulesConfig,
    ) -> Result<RuleRunReport> {
        config.validate()?;

        info!(rules = config.rules.len(), "rule run started");
        let mut used_samples: AHashSet<&str> = AHashSet::new();
        let mut report = RuleRunReport::default();

        for (index, rule) in config.rules.iter().enumerate() {
            if rule.sample.is_empty() {
                debug!(index, "rule skipped: missing pattern sample");
                report.skipped += 1;
                report.outcomes.push(RuleOutcome {
                    index,
                    sample: rule.sample.clone(),
                    action: rule.action,
                    status: RuleStatus::SkippedEmptySample,
                    affected: 0,
                    message: format!("Rule {}: skipped, missing pattern sample", index + 1),
                });
                continue;
            }

            if !used_samples.insert(&rule.sample) {
                debug!(index, sample = %rule.sample, "rule skipped: sample already used");
                report.skipped += 1;
                report.outcomes.push(RuleOutcome {
                    index,
                    sample: rule.sample.clone(),
                    action: rule.action,
                    status: RuleStatus::SkippedDuplicateSample,
                    affected: 0,
                    message: format!(
                        "Rule {}: skipped, sample '{}' was already used in a previous rule",
                        index + 1,
                        rule.sample
                    ),
                });
                continue;
            }

            let selected = select_entities(store, working_set, &rule.sample);
            let outcome = Self::dispatch(store, index, rule, &selected, config, &mut report)?;
            report.outcomes.push(outcome);
        }

        info!(
            moved = report.moved,
            renamed = report.renamed,
            merged = report.merged,
            deleted = report.deleted,
            skipped = report.skipped,
            "rule run finished"
        );
        Ok(report)
    }

    fn dispatch(
        store: &mut SceneStore,
        index: usize,
        rule: &PatternRule,
        selected: &[EntityId],
        config: &RulesConfig,
        report: &mut RuleRunReport,
    ) -> Result<RuleOutcome> {
        let output = rule.effective_output();
        let outcome = match rule.action {
            RuleAction::Organize => {
                let container = ContainerResolver::resolve(
                    store,
                    output,
                    rule.parent.as_deref(),
                    config.main_container.as_deref(),
                )?;
                for &id in selected {
                    store.move_entity(id, container)?;
                }
                report.moved += selected.len();
                RuleOutcome {
                    index,
                    sample: rule.sample.clone(),
                    action: rule.action,
                    status: RuleStatus::Applied,
                    affected: selected.len(),
                    message: format!(
                        "Rule {}: {} entities organized into container '{output}'",
                        index + 1,
                        selected.len()
                    ),
                }
            }
            RuleAction::Rename => {
                let container = ContainerResolver::resolve(
                    store,
                    output,
                    rule.parent.as_deref(),
                    config.main_container.as_deref(),
                )?;
                let template = rule.rename_template.as_deref().unwrap_or(output);
                for (ordinal, &id) in selected.iter().enumerate() {
                    store.rename_entity(id, format!("{template}.{:03}", ordinal + 1))?;
                    store.move_entity(id, container)?;
                }
                report.renamed += selected.len();
                report.moved += selected.len();
                RuleOutcome {
                    index,
                    sample: rule.sample.clone(),
                    action: rule.action,
                    status: RuleStatus::Applied,
                    affected: selected.len(),
                    message: format!(
                        "Rule {}: {} entities renamed to '{template}.###' and moved to '{output}'",
                        index + 1,
                        selected.len()
                    ),
                }
            }
            RuleAction::Join => {
                if selected.len() < 2 {
                    debug!(index, sample = %rule.sample, "join skipped: fewer than 2 entities");
                    report.skipped += 1;
                    RuleOutcome {
                        index,
                        sample: rule.sample.clone(),
                        action: rule.action,
                        status: RuleStatus::NoOp,
                        affected: 0,
                        message: format!(
                            "Rule {}: fewer than 2 entities matched, nothing to join",
                            index + 1
                        ),
                    }
                } else {
                    let container = ContainerResolver::resolve(
                        store,
                        output,
                        rule.parent.as_deref(),
                        config.main_container.as_deref(),
                    )?;
                    let survivor = store.merge_entities(selected)?;
                    store.move_entity(survivor, container)?;
                    report.merged += selected.len() - 1;
                    report.moved += 1;
                    RuleOutcome {
                        index,
                        sample: rule.sample.clone(),
                        action: rule.action,
                        status: RuleStatus::Applied,
                        affected: selected.len(),
                        message: format!(
                            "Rule {}: {} entities joined and moved to '{output}'",
                            index + 1,
                            selected.len()
                        ),
                    }
                }
            }
            RuleAction::Delete => {
                for &id in selected {
                    store.remove_entity(id)?;
                }
                report.deleted += selected.len();
                RuleOutcome {
                    index,
                    sample: rule.sample.clone(),
                    action: rule.action,
                    status: RuleStatus::Applied,
                    affected: selected.len(),
                    message: format!(
                        "Rule {}: {} entities deleted using pattern '{}'",
                        index + 1,
                        selected.len(),
                        rule.sample
                    ),
                }
            }
        };
        Ok(outcome)
    }
}

/// Select live working-set entities whose names contain the sample,
/// case-insensitively, preserving working-set order.
fn select_entities(store: &SceneStore, working_set: &[EntityId], sample: &str) -> Vec<EntityId> {
    let needle = sample.to_lowercase();
    let mut seen = AHashSet::new();
    working_set
        .iter()
        .copied()
        .filter(|&id| seen.insert(id))
        .filter(|&id| {
            store
                .entity(id)
                .map(|e| e.name().to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .collect()
}
