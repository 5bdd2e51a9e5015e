//! Spatial proximity clustering.
//!
//! Partitions a working set of entities into connected clusters: two
//! entities land in the same cluster iff they are connected by a chain of
//! pairwise distances, computed over the enabled axes only, each within the
//! configured threshold. The relation's transitive closure is independent of
//! traversal order, so the partition is unique; union-find over the pairwise
//! scan computes it directly.
//!
//! The scan is O(n²), which is fine for the few hundred entities a CAD
//! import produces.

use nalgebra::Vector3;
use petgraph::unionfind::UnionFind;
use tracing::debug;

use crate::core::config::{AxisMask, ProximityConfig};
use crate::core::errors::Result;
use crate::core::scene::{EntityId, SceneStore};

/// A maximal set of entities connected by the proximity relation.
///
/// Singleton clusters are valid and are no-ops for merge actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Member entities in working-set order
    pub members: Vec<EntityId>,
}

impl Cluster {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the cluster has a single member (nothing to merge).
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Proximity clusterer over a scene store working set.
#[derive(Debug, Default)]
pub struct SpatialClusterer;

impl SpatialClusterer {
    /// Partition the working set into proximity clusters.
    ///
    /// Entities without mesh geometry are filtered out before clustering and
    /// appear in no cluster. Clusters and their members are reported in
    /// working-set order.
    pub fn cluster(
        store: &SceneStore,
        working_set: &[EntityId],
        config: &ProximityConfig,
    ) -> Result<Vec<Cluster>> {
        config.validate()?;

        let mut candidates = Vec::with_capacity(working_set.len());
        let mut seen = ahash::AHashSet::new();
        for &id in working_set {
            if !seen.insert(id) {
                continue;
            }
            if let Ok(entity) = store.entity(id) {
                if entity.mesh().is_some() {
                    candidates.push((id, entity.position));
                }
            }
        }

        let n = candidates.len();
        let mut components: UnionFind<usize> = UnionFind::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let distance = masked_distance(
                    candidates[i].1 - candidates[j].1,
                    config.axes,
                );
                if distance <= config.threshold {
                    components.union(i, j);
                }
            }
        }

        let mut clusters: indexmap::IndexMap<usize, Cluster> = indexmap::IndexMap::new();
        for (index, &(id, _)) in candidates.iter().enumerate() {
            let representative = components.find(index);
            clusters
                .entry(representative)
                .or_insert_with(|| Cluster {
                    members: Vec::new(),
                })
                .members
                .push(id);
        }

        let clusters: Vec<Cluster> = clusters.into_values().collect();
        debug!(
            entities = n,
            clusters = clusters.len(),
            threshold = config.threshold,
            "proximity clustering complete"
        );
        Ok(clusters)
    }
}

/// Euclidean distance of a difference vector with masked axes zeroed.
fn masked_distance(mut diff: Vector3<f64>, mask: AxisMask) -> f64 {
    if !mask.x {
        diff.x = 0.0;
    }
    if !mask.y {
        diff.y = 0.0;
    }
    if !mask.z {
        diff.z = 0.0;
    }
    diff.norm()
}
