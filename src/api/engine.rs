//! Main cleanup engine implementation.
//!
//! [`ScenesortEngine`] is the facade the host calls. It validates its
//! configuration once at construction and then exposes one entry point per
//! cleanup pass. Every entry point takes the scene store and an explicit
//! working set of entity ids; there is no ambient selection. Execution is
//! synchronous and single-threaded, and the engine assumes exclusive access
//! to the store for the duration of each call.

use tracing::info;

use crate::api::results::{ClusterReport, DedupeReport, PatternReport, ProximityJoinReport};
use crate::core::config::{RulesConfig, ScenesortConfig};
use crate::core::errors::Result;
use crate::core::scene::{EntityId, SceneStore};
use crate::detectors::dedupe::Deduplicator;
use crate::detectors::patterns::PatternDetector;
use crate::detectors::proximity::SpatialClusterer;
use crate::rules::engine::{RuleEngine, RuleRunReport};

/// Main scenesort cleanup engine.
#[derive(Debug, Clone)]
pub struct ScenesortEngine {
    config: ScenesortConfig,
}

impl ScenesortEngine {
    /// Create a new engine with the given configuration.
    pub fn new(config: ScenesortConfig) -> Result<Self> {
        config.validate()?;
        info!("scenesort engine initialized");
        Ok(Self { config })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &ScenesortConfig {
        &self.config
    }

    /// Partition the working set into proximity clusters and report the
    /// grouping without mutating the store.
    pub fn cluster_by_proximity(
        &self,
        store: &SceneStore,
        working_set: &[EntityId],
    ) -> Result<ClusterReport> {
        if working_set.len() < 2 {
            return Ok(ClusterReport {
                note: Some("Need at least 2 entities to cluster.".to_string()),
                ..Default::default()
            });
        }

        let clusters = SpatialClusterer::cluster(store, working_set, &self.config.proximity)?;
        let considered = clusters.iter().map(|c| c.len()).sum();
        Ok(ClusterReport {
            clusters: clusters.into_iter().map(|c| c.members).collect(),
            considered,
            note: None,
        })
    }

    /// Cluster the working set and merge every cluster of size >= 2 into its
    /// first member.
    pub fn join_by_proximity(
        &self,
        store: &mut SceneStore,
        working_set: &[EntityId],
    ) -> Result<ProximityJoinReport> {
        if working_set.len() < 2 {
            return Ok(ProximityJoinReport {
                note: Some("Need at least 2 entities to join.".to_string()),
                ..Default::default()
            });
        }

        let clusters = SpatialClusterer::cluster(store, working_set, &self.config.proximity)?;
        let mut report = ProximityJoinReport {
            clusters: clusters.len(),
            ..Default::default()
        };
        for cluster in &clusters {
            if cluster.is_singleton() {
                continue;
            }
            store.merge_entities(&cluster.members)?;
            report.joined += 1;
            report.entities_merged += cluster.len() - 1;
        }

        info!(
            clusters = report.clusters,
            joined = report.joined,
            "proximity join finished"
        );
        Ok(report)
    }

    /// Group the working set by geometry fingerprint without mutating the
    /// store.
    pub fn find_duplicates(
        &self,
        store: &SceneStore,
        working_set: &[EntityId],
    ) -> Result<DedupeReport> {
        if working_set.len() < 2 {
            return Ok(DedupeReport {
                note: Some("Need at least 2 entities to deduplicate.".to_string()),
                ..Default::default()
            });
        }

        let groups = Deduplicator::group(store, working_set, &self.config.dedupe)?;
        Ok(DedupeReport {
            duplicates: groups
                .iter()
                .filter(|g| !g.is_singleton())
                .map(|g| g.members.len() - 1)
                .sum(),
            groups: groups.into_iter().map(|g| g.members).collect(),
            relinked: 0,
            note: None,
        })
    }

    /// Group the working set by geometry fingerprint and unify each group's
    /// geometry into one shared mesh record.
    pub fn link_duplicates(
        &self,
        store: &mut SceneStore,
        working_set: &[EntityId],
    ) -> Result<DedupeReport> {
        if working_set.len() < 2 {
            return Ok(DedupeReport {
                note: Some("Need at least 2 entities to deduplicate.".to_string()),
                ..Default::default()
            });
        }

        let groups = Deduplicator::group(store, working_set, &self.config.dedupe)?;
        let relinked = Deduplicator::link_instances(store, &groups)?;

        info!(groups = groups.len(), relinked, "duplicate linking finished");
        Ok(DedupeReport {
            duplicates: groups
                .iter()
                .filter(|g| !g.is_singleton())
                .map(|g| g.members.len() - 1)
                .sum(),
            groups: groups.into_iter().map(|g| g.members).collect(),
            relinked,
            note: None,
        })
    }

    /// Infer naming patterns from a list of entity names.
    pub fn detect_patterns<S: AsRef<str>>(&self, names: &[S]) -> PatternReport {
        use crate::detectors::patterns::MIN_RELIABLE_NAMES;
        if names.len() < MIN_RELIABLE_NAMES {
            return PatternReport {
                names_analyzed: names.len(),
                note: Some(format!(
                    "Need at least {MIN_RELIABLE_NAMES} names for reliable pattern detection."
                )),
                ..Default::default()
            };
        }

        let patterns = PatternDetector::detect(names);
        PatternReport {
            patterns,
            names_analyzed: names.len(),
            note: None,
        }
    }

    /// Apply the engine's configured rule list against the working set.
    pub fn apply_rules(
        &self,
        store: &mut SceneStore,
        working_set: &[EntityId],
    ) -> Result<RuleRunReport> {
        RuleEngine::run(store, working_set, &self.config.rules)
    }

    /// Apply an explicit rule list, for callers that edit rules between
    /// runs. The per-run dedup guard still applies within the list.
    pub fn apply_rule_list(
        &self,
        store: &mut SceneStore,
        working_set: &[EntityId],
        rules: &RulesConfig,
    ) -> Result<RuleRunReport> {
        RuleEngine::run(store, working_set, rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProximityConfig;
    use crate::core::scene::MeshData;
    use nalgebra::Point3;

    fn engine() -> ScenesortEngine {
        ScenesortEngine::new(ScenesortConfig::default()).unwrap()
    }

    fn add_meshed(store: &mut SceneStore, name: &str, x: f64) -> EntityId {
        let id = store.add_entity(name, Point3::new(x, 0.0, 0.0));
        store
            .attach_mesh(id, MeshData::new(vec![Point3::origin()]))
            .unwrap();
        id
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = ScenesortConfig {
            proximity: ProximityConfig::default().with_threshold(-1.0),
            ..Default::default()
        };
        assert!(ScenesortEngine::new(config).is_err());
    }

    #[test]
    fn test_small_working_set_is_informational_skip() {
        let mut store = SceneStore::new();
        let only = add_meshed(&mut store, "A", 0.0);

        let engine = engine();
        let report = engine.cluster_by_proximity(&store, &[only]).unwrap();
        assert!(report.note.is_some());
        assert!(report.clusters.is_empty());

        let report = engine.join_by_proximity(&mut store, &[only]).unwrap();
        assert_eq!(report.joined, 0);
        assert!(report.note.is_some());

        let report = engine.find_duplicates(&store, &[only]).unwrap();
        assert!(report.note.is_some());
    }

    #[test]
    fn test_join_by_proximity_merges_clusters() {
        let mut store = SceneStore::new();
        let a = add_meshed(&mut store, "A", 0.0);
        let b = add_meshed(&mut store, "B", 1.0);
        let far = add_meshed(&mut store, "Far", 100.0);

        let engine = engine();
        let report = engine.join_by_proximity(&mut store, &[a, b, far]).unwrap();

        assert_eq!(report.clusters, 2);
        assert_eq!(report.joined, 1);
        assert_eq!(report.entities_merged, 1);
        assert_eq!(report.summary(), "Joined 1 clusters.");
        assert!(store.is_live(a));
        assert!(!store.is_live(b));
        assert!(store.is_live(far));
    }

    #[test]
    fn test_pattern_detection_below_threshold_notes() {
        let engine = engine();
        let names = vec!["Wall_01".to_string(); 5];
        let report = engine.detect_patterns(&names);
        assert!(report.note.is_some());
        assert!(report.patterns.is_empty());
        assert_eq!(report.names_analyzed, 5);
    }

    #[test]
    fn test_link_duplicates_reports_relinks() {
        let mut store = SceneStore::new();
        let a = add_meshed(&mut store, "A", 0.0);
        let b = add_meshed(&mut store, "B", 5.0);

        let engine = engine();
        let report = engine.link_duplicates(&mut store, &[a, b]).unwrap();
        assert_eq!(report.relinked, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(
            store.entity(a).unwrap().mesh(),
            store.entity(b).unwrap().mesh()
        );
    }
}
