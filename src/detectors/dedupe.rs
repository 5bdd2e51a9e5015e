//! Geometry fingerprinting and duplicate detection.
//!
//! Computes an equivalence key per entity from rounded geometry plus
//! material identity, then groups entities sharing a key. Equal fingerprints
//! across distinct entities mean "same underlying shape": their geometry
//! references are unified into one shared mesh record, so later edits
//! propagate to every linked entity. Nothing is deleted; every entity keeps
//! its own transform.
//!
//! Rounding precision is the caller's tradeoff: coarser rounding merges more
//! (and risks collapsing genuinely different meshes), finer rounding splits
//! more.

use indexmap::IndexMap;
use tracing::debug;
use xxhash_rust::xxh3::Xxh3;

use crate::core::config::{DedupeConfig, DedupeMode};
use crate::core::scene::{Entity, EntityId, SceneStore};
use crate::core::errors::Result;

/// Sentinel written for an empty material slot.
const EMPTY_SLOT_SENTINEL: &str = "None";

/// Opaque geometry equality key.
///
/// Fingerprints are only ever compared for equality; they carry no ordering
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u128);

/// Entities sharing one fingerprint.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// The shared equality key
    pub fingerprint: Fingerprint,
    /// Member entities in working-set order; the first is the link primary
    pub members: Vec<EntityId>,
}

impl DuplicateGroup {
    /// Whether the group has a single member (no-op for linking).
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Geometry fingerprint computation.
#[derive(Debug, Default)]
pub struct GeometryFingerprinter;

impl GeometryFingerprinter {
    /// Compute the fingerprint of a mesh-bearing entity.
    ///
    /// Returns `None` for entities without geometry.
    pub fn fingerprint(
        store: &SceneStore,
        entity: &Entity,
        config: &DedupeConfig,
    ) -> Result<Option<Fingerprint>> {
        let Some(mesh_id) = entity.mesh() else {
            return Ok(None);
        };

        let mut hasher = Xxh3::new();
        match config.mode {
            DedupeMode::BoundingBox => {
                for component in [entity.dimensions.x, entity.dimensions.y, entity.dimensions.z] {
                    hasher.update(&round_fixed(component, config.precision).to_le_bytes());
                }
            }
            DedupeMode::FullTopology => {
                let mesh = store.mesh(mesh_id)?;
                // All x's, then all y's, then all z's, matching the tuple
                // layout the key was originally defined over.
                for axis in 0..3 {
                    for vertex in &mesh.vertices {
                        hasher.update(&round_fixed(vertex[axis], config.precision).to_le_bytes());
                    }
                }
            }
        }

        // Domain separator between geometry and the material tuple.
        hasher.update(&[0xFE]);
        for slot in &entity.materials {
            let name = slot.as_deref().unwrap_or(EMPTY_SLOT_SENTINEL);
            hasher.update(name.as_bytes());
            hasher.update(&[0xFF]);
        }

        Ok(Some(Fingerprint(hasher.digest128())))
    }
}

/// Duplicate grouping and instance linking over a working set.
#[derive(Debug, Default)]
pub struct Deduplicator;

impl Deduplicator {
    /// Group working-set entities by equal fingerprint.
    ///
    /// Mesh-less entities are skipped. Groups are reported in first-seen
    /// order; singleton groups are retained (callers decide whether to show
    /// them) but are no-ops for linking.
    pub fn group(
        store: &SceneStore,
        working_set: &[EntityId],
        config: &DedupeConfig,
    ) -> Result<Vec<DuplicateGroup>> {
        config.validate()?;

        let mut groups: IndexMap<Fingerprint, Vec<EntityId>> = IndexMap::new();
        let mut seen = ahash::AHashSet::new();
        for &id in working_set {
            if !seen.insert(id) {
                continue;
            }
            let Ok(entity) = store.entity(id) else {
                continue;
            };
            if let Some(fingerprint) = GeometryFingerprinter::fingerprint(store, entity, config)? {
                groups.entry(fingerprint).or_default().push(id);
            }
        }

        debug!(
            entities = seen.len(),
            groups = groups.len(),
            mode = ?config.mode,
            precision = config.precision,
            "fingerprint grouping complete"
        );

        Ok(groups
            .into_iter()
            .map(|(fingerprint, members)| DuplicateGroup {
                fingerprint,
                members,
            })
            .collect())
    }

    /// Unify geometry references within each group of size >= 2: every
    /// member is redirected to the first member's mesh record. Returns the
    /// number of entities relinked.
    pub fn link_instances(store: &mut SceneStore, groups: &[DuplicateGroup]) -> Result<usize> {
        let mut relinked = 0;
        for group in groups {
            if group.is_singleton() {
                continue;
            }
            let (&primary, rest) = group
                .members
                .split_first()
                .expect("non-singleton group has members");
            relinked += store.share_mesh(primary, rest)?;
        }
        debug!(relinked, "duplicate instances linked");
        Ok(relinked)
    }
}

/// Fixed-point rounding to `precision` decimal places.
fn round_fixed(value: f64, precision: u32) -> i64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() as i64
}
