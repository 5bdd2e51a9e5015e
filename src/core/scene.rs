//! Entity/container scene store.
//!
//! This module owns the working data model the detectors and the rule engine
//! mutate: named entities with positions, bounding dimensions, optional mesh
//! geometry and material slots, organized into an acyclic hierarchy of named
//! containers. The store stands in for the host's scene database; every core
//! entry point receives it explicitly together with a working set of entity
//! ids, so there is no ambient selection state.
//!
//! Two invariants are enforced here rather than by callers:
//!
//! - an entity belongs to exactly one container at any time (moving is
//!   unlink-then-link),
//! - no container is its own ancestor.

use ahash::AHashMap;
use indexmap::IndexSet;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ScenesortError};

/// Name of the implicit root container every store starts with.
pub const ROOT_CONTAINER_NAME: &str = "Scene Collection";

/// Opaque handle to an entity owned by a [`SceneStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Opaque handle to a container owned by a [`SceneStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(u64);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Opaque handle to a mesh record owned by a [`SceneStore`].
///
/// Multiple entities may reference the same mesh; that is how deduplicated
/// geometry is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(u64);

/// Mesh geometry: an ordered list of vertex positions local to the owning
/// entity's position.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions in entity-local space
    pub vertices: Vec<Point3<f64>>,
}

impl MeshData {
    /// Create a mesh from a list of local vertex positions
    pub fn new(vertices: Vec<Point3<f64>>) -> Self {
        Self { vertices }
    }
}

/// A positioned, named scene object.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    name: String,
    /// World-space position
    pub position: Point3<f64>,
    /// Axis-aligned bounding-box dimensions
    pub dimensions: Vector3<f64>,
    /// Material slots in assignment order; an empty slot is `None`
    pub materials: Vec<Option<String>>,
    mesh: Option<MeshId>,
    container: ContainerId,
}

impl Entity {
    /// Stable handle of this entity
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mesh reference, if this entity carries geometry
    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    /// The container this entity currently belongs to
    pub fn container(&self) -> ContainerId {
        self.container
    }
}

/// A named, hierarchical grouping construct owning entities and nested
/// containers.
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    name: String,
    parent: Option<ContainerId>,
    entities: IndexSet<EntityId>,
    children: IndexSet<ContainerId>,
}

impl Container {
    /// Stable handle of this container
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Container name, unique within the store
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent container, `None` only for the root
    pub fn parent(&self) -> Option<ContainerId> {
        self.parent
    }

    /// Member entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().copied()
    }

    /// Child containers in insertion order
    pub fn children(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.children.iter().copied()
    }

    /// Whether the given entity is a direct member
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }
}

/// The entity/container/mesh store shared by all engine components.
///
/// The store assumes exclusive access for the duration of one engine
/// invocation; there is no interior locking and no rollback. Mutations
/// committed by earlier rules or clusters in a run stay applied if a later
/// operation fails.
#[derive(Debug)]
pub struct SceneStore {
    entities: AHashMap<EntityId, Entity>,
    containers: AHashMap<ContainerId, Container>,
    container_names: AHashMap<String, ContainerId>,
    meshes: AHashMap<MeshId, MeshData>,
    root: ContainerId,
    next_entity: u64,
    next_container: u64,
    next_mesh: u64,
}

impl SceneStore {
    /// Create an empty store with a root container.
    pub fn new() -> Self {
        let root = ContainerId(0);
        let mut containers = AHashMap::new();
        containers.insert(
            root,
            Container {
                id: root,
                name: ROOT_CONTAINER_NAME.to_string(),
                parent: None,
                entities: IndexSet::new(),
                children: IndexSet::new(),
            },
        );
        let mut container_names = AHashMap::new();
        container_names.insert(ROOT_CONTAINER_NAME.to_string(), root);

        Self {
            entities: AHashMap::new(),
            containers,
            container_names,
            meshes: AHashMap::new(),
            root,
            next_entity: 0,
            next_container: 1,
            next_mesh: 0,
        }
    }

    /// Root container of the scene.
    pub fn root(&self) -> ContainerId {
        self.root
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of containers, root included.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Whether the entity handle still refers to a live entity.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Add a new entity under the root container.
    pub fn add_entity(&mut self, name: impl Into<String>, position: Point3<f64>) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;

        self.entities.insert(
            id,
            Entity {
                id,
                name: name.into(),
                position,
                dimensions: Vector3::zeros(),
                materials: Vec::new(),
                mesh: None,
                container: self.root,
            },
        );
        self.containers
            .get_mut(&self.root)
            .expect("root container always exists")
            .entities
            .insert(id);
        id
    }

    /// Look up an entity.
    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(&id)
            .ok_or_else(|| ScenesortError::scene_element("entity not found", id.to_string()))
    }

    /// Look up an entity for mutation.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities
            .get_mut(&id)
            .ok_or_else(|| ScenesortError::scene_element("entity not found", id.to_string()))
    }

    /// Look up a container.
    pub fn container(&self, id: ContainerId) -> Result<&Container> {
        self.containers
            .get(&id)
            .ok_or_else(|| ScenesortError::scene_element("container not found", id.to_string()))
    }

    /// Find a container by name.
    pub fn container_by_name(&self, name: &str) -> Option<ContainerId> {
        self.container_names.get(name).copied()
    }

    /// Return the container with the given name, creating it under the root
    /// if it does not exist yet. Containers are reused by name.
    pub fn get_or_create_container(&mut self, name: &str) -> ContainerId {
        if let Some(id) = self.container_by_name(name) {
            return id;
        }
        let id = ContainerId(self.next_container);
        self.next_container += 1;
        self.containers.insert(
            id,
            Container {
                id,
                name: name.to_string(),
                parent: Some(self.root),
                entities: IndexSet::new(),
                children: IndexSet::new(),
            },
        );
        self.container_names.insert(name.to_string(), id);
        self.containers
            .get_mut(&self.root)
            .expect("root container always exists")
            .children
            .insert(id);
        id
    }

    /// Re-parent `child` under `parent`, rejecting anything that would make a
    /// container its own ancestor.
    pub fn link_container(&mut self, child: ContainerId, parent: ContainerId) -> Result<()> {
        if child == self.root {
            return Err(ScenesortError::scene("cannot re-parent the root container"));
        }
        if child == parent {
            return Err(ScenesortError::scene_element(
                "container cannot be its own parent",
                child.to_string(),
            ));
        }
        self.container(child)?;
        self.container(parent)?;

        // Walk up from the prospective parent; hitting `child` means a cycle.
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(ScenesortError::scene_element(
                    "link would make container its own ancestor",
                    child.to_string(),
                ));
            }
            cursor = self.containers[&current].parent;
        }

        let old_parent = self.containers[&child].parent;
        if let Some(old) = old_parent {
            self.containers
                .get_mut(&old)
                .expect("parent container exists")
                .children
                .shift_remove(&child);
        }
        self.containers.get_mut(&child).unwrap().parent = Some(parent);
        self.containers
            .get_mut(&parent)
            .unwrap()
            .children
            .insert(child);
        Ok(())
    }

    /// Move an entity into a container (unlink from its current one first).
    pub fn move_entity(&mut self, entity: EntityId, container: ContainerId) -> Result<()> {
        self.container(container)?;
        let old = self.entity(entity)?.container;
        if old == container {
            return Ok(());
        }
        self.containers
            .get_mut(&old)
            .expect("owning container exists")
            .entities
            .shift_remove(&entity);
        self.containers
            .get_mut(&container)
            .unwrap()
            .entities
            .insert(entity);
        self.entities.get_mut(&entity).unwrap().container = container;
        Ok(())
    }

    /// Rename an entity.
    pub fn rename_entity(&mut self, entity: EntityId, name: impl Into<String>) -> Result<()> {
        self.entity_mut(entity)?.name = name.into();
        Ok(())
    }

    /// Permanently remove an entity. Mesh records left without users are
    /// dropped with it.
    pub fn remove_entity(&mut self, entity: EntityId) -> Result<()> {
        let removed = self
            .entities
            .remove(&entity)
            .ok_or_else(|| ScenesortError::scene_element("entity not found", entity.to_string()))?;
        self.containers
            .get_mut(&removed.container)
            .expect("owning container exists")
            .entities
            .shift_remove(&entity);
        if let Some(mesh) = removed.mesh {
            self.drop_mesh_if_orphaned(mesh);
        }
        Ok(())
    }

    /// Register a mesh record and assign it to an entity, replacing any
    /// previous geometry reference.
    pub fn attach_mesh(&mut self, entity: EntityId, mesh: MeshData) -> Result<MeshId> {
        self.entity(entity)?;
        let id = MeshId(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(id, mesh);
        let old = self.entities.get_mut(&entity).unwrap().mesh.replace(id);
        if let Some(old) = old {
            self.drop_mesh_if_orphaned(old);
        }
        Ok(id)
    }

    /// Look up mesh geometry.
    pub fn mesh(&self, id: MeshId) -> Result<&MeshData> {
        self.meshes
            .get(&id)
            .ok_or_else(|| ScenesortError::scene("mesh record not found"))
    }

    /// Look up mesh geometry for mutation. Edits propagate to every entity
    /// sharing the record.
    pub fn mesh_mut(&mut self, id: MeshId) -> Result<&mut MeshData> {
        self.meshes
            .get_mut(&id)
            .ok_or_else(|| ScenesortError::scene("mesh record not found"))
    }

    /// Number of entities referencing the given mesh record.
    pub fn mesh_users(&self, id: MeshId) -> usize {
        self.entities.values().filter(|e| e.mesh == Some(id)).count()
    }

    /// Merge entities into the first one (the primary), which keeps its
    /// identity, position, and container. The others' vertices are appended
    /// to the primary's mesh in primary-local space, their material slots
    /// appended without duplicates, and the entities removed.
    ///
    /// A primary whose mesh record is shared gets its own copy before the
    /// append, so entities outside the merge keep their geometry.
    ///
    /// This is the host-level join primitive: it fails on stale handles and
    /// leaves earlier mutations in place.
    pub fn merge_entities(&mut self, ids: &[EntityId]) -> Result<EntityId> {
        let (&primary, rest) = ids
            .split_first()
            .ok_or_else(|| ScenesortError::operation("merge_entities", "empty entity list"))?;
        for &id in ids {
            if !self.is_live(id) {
                return Err(ScenesortError::operation(
                    "merge_entities",
                    format!("{id} is stale"),
                ));
            }
        }
        if rest.is_empty() {
            return Ok(primary);
        }

        let primary_pos = self.entities[&primary].position;

        // Snapshot absorbed geometry/materials before any mutation.
        let mut absorbed_vertices = Vec::new();
        let mut absorbed_materials = Vec::new();
        for &id in rest {
            let other = &self.entities[&id];
            if let Some(mesh) = other.mesh {
                let offset = other.position - primary_pos;
                for v in &self.meshes[&mesh].vertices {
                    absorbed_vertices.push(v + offset);
                }
            }
            absorbed_materials.extend(other.materials.iter().cloned());
        }

        // A primary without geometry gets an empty mesh record to absorb
        // into. A record shared with entities outside the selection is
        // copied first, so the join never mutates bystander geometry.
        let primary_mesh = match self.entities[&primary].mesh {
            Some(mesh) if self.mesh_users(mesh) > 1 => {
                let copy = self.meshes[&mesh].clone();
                self.attach_mesh(primary, copy)?
            }
            Some(mesh) => mesh,
            None => self.attach_mesh(primary, MeshData::default())?,
        };
        self.meshes
            .get_mut(&primary_mesh)
            .expect("primary mesh exists")
            .vertices
            .extend(absorbed_vertices);

        let primary_entity = self.entities.get_mut(&primary).unwrap();
        for slot in absorbed_materials {
            if !primary_entity.materials.contains(&slot) {
                primary_entity.materials.push(slot);
            }
        }

        for &id in rest {
            self.remove_entity(id)?;
        }

        self.refresh_dimensions(primary);
        Ok(primary)
    }

    /// Redirect every entity in `others` to share the primary's mesh record.
    /// Positions and transforms are untouched; orphaned mesh records are
    /// dropped. Returns the number of entities relinked.
    pub fn share_mesh(&mut self, primary: EntityId, others: &[EntityId]) -> Result<usize> {
        let target = self.entity(primary)?.mesh.ok_or_else(|| {
            ScenesortError::operation("share_mesh", format!("{primary} carries no mesh"))
        })?;

        let mut relinked = 0;
        for &id in others {
            if id == primary {
                continue;
            }
            let entity = self.entity_mut(id)?;
            let old = entity.mesh.replace(target);
            if old != Some(target) {
                relinked += 1;
            }
            if let Some(old) = old {
                if old != target {
                    self.drop_mesh_if_orphaned(old);
                }
            }
        }
        Ok(relinked)
    }

    /// Recompute an entity's bounding dimensions from its mesh extents.
    fn refresh_dimensions(&mut self, entity: EntityId) {
        let Some(mesh) = self.entities[&entity].mesh else {
            return;
        };
        let vertices = &self.meshes[&mesh].vertices;
        if vertices.is_empty() {
            return;
        }
        let mut min = vertices[0];
        let mut max = vertices[0];
        for v in vertices.iter().skip(1) {
            min = Point3::new(min.x.min(v.x), min.y.min(v.y), min.z.min(v.z));
            max = Point3::new(max.x.max(v.x), max.y.max(v.y), max.z.max(v.z));
        }
        self.entities.get_mut(&entity).unwrap().dimensions = max - min;
    }

    fn drop_mesh_if_orphaned(&mut self, mesh: MeshId) {
        if self.mesh_users(mesh) == 0 {
            self.meshes.remove(&mesh);
        }
    }
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_entities(n: usize) -> (SceneStore, Vec<EntityId>) {
        let mut store = SceneStore::new();
        let ids = (0..n)
            .map(|i| store.add_entity(format!("Part_{i:02}"), Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        (store, ids)
    }

    #[test]
    fn test_entity_membership_is_exclusive() {
        let (mut store, ids) = store_with_entities(1);
        let walls = store.get_or_create_container("Walls");
        let doors = store.get_or_create_container("Doors");

        store.move_entity(ids[0], walls).unwrap();
        assert!(store.container(walls).unwrap().contains_entity(ids[0]));
        assert!(!store.container(store.root()).unwrap().contains_entity(ids[0]));

        store.move_entity(ids[0], doors).unwrap();
        assert!(!store.container(walls).unwrap().contains_entity(ids[0]));
        assert!(store.container(doors).unwrap().contains_entity(ids[0]));
        assert_eq!(store.entity(ids[0]).unwrap().container(), doors);
    }

    #[test]
    fn test_container_reuse_by_name() {
        let mut store = SceneStore::new();
        let first = store.get_or_create_container("Walls");
        let second = store.get_or_create_container("Walls");
        assert_eq!(first, second);
        assert_eq!(store.container_count(), 2); // root + Walls
    }

    #[test]
    fn test_container_cycle_rejected() {
        let mut store = SceneStore::new();
        let a = store.get_or_create_container("A");
        let b = store.get_or_create_container("B");
        let c = store.get_or_create_container("C");

        store.link_container(b, a).unwrap();
        store.link_container(c, b).unwrap();

        let err = store.link_container(a, c).unwrap_err();
        assert!(err.to_string().contains("ancestor"));

        let err = store.link_container(a, a).unwrap_err();
        assert!(err.to_string().contains("own parent"));
    }

    #[test]
    fn test_root_cannot_be_reparented() {
        let mut store = SceneStore::new();
        let a = store.get_or_create_container("A");
        assert!(store.link_container(store.root(), a).is_err());
    }

    #[test]
    fn test_remove_entity_drops_orphaned_mesh() {
        let (mut store, ids) = store_with_entities(1);
        let mesh = store
            .attach_mesh(ids[0], MeshData::new(vec![Point3::origin()]))
            .unwrap();
        store.remove_entity(ids[0]).unwrap();
        assert!(store.mesh(mesh).is_err());
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn test_shared_mesh_survives_single_removal() {
        let (mut store, ids) = store_with_entities(2);
        let mesh = store
            .attach_mesh(ids[0], MeshData::new(vec![Point3::origin()]))
            .unwrap();
        store.share_mesh(ids[0], &[ids[1]]).unwrap();
        assert_eq!(store.mesh_users(mesh), 2);

        store.remove_entity(ids[0]).unwrap();
        assert!(store.mesh(mesh).is_ok());
        assert_eq!(store.mesh_users(mesh), 1);
    }

    #[test]
    fn test_shared_mesh_edit_propagates() {
        let (mut store, ids) = store_with_entities(2);
        let mesh = store
            .attach_mesh(ids[0], MeshData::new(vec![Point3::origin()]))
            .unwrap();
        store.share_mesh(ids[0], &[ids[1]]).unwrap();

        store
            .mesh_mut(mesh)
            .unwrap()
            .vertices
            .push(Point3::new(1.0, 1.0, 1.0));

        let through_other = store.entity(ids[1]).unwrap().mesh().unwrap();
        assert_eq!(store.mesh(through_other).unwrap().vertices.len(), 2);
    }

    #[test]
    fn test_merge_appends_world_space_vertices() {
        let mut store = SceneStore::new();
        let a = store.add_entity("A", Point3::new(0.0, 0.0, 0.0));
        let b = store.add_entity("B", Point3::new(10.0, 0.0, 0.0));
        store
            .attach_mesh(a, MeshData::new(vec![Point3::new(0.0, 0.0, 0.0)]))
            .unwrap();
        store
            .attach_mesh(b, MeshData::new(vec![Point3::new(1.0, 0.0, 0.0)]))
            .unwrap();
        store.entity_mut(b).unwrap().materials = vec![Some("steel".to_string())];

        let survivor = store.merge_entities(&[a, b]).unwrap();
        assert_eq!(survivor, a);
        assert!(!store.is_live(b));

        let mesh = store.entity(a).unwrap().mesh().unwrap();
        let vertices = &store.mesh(mesh).unwrap().vertices;
        assert_eq!(vertices.len(), 2);
        // B's local vertex (1,0,0) at world x=11 lands at primary-local x=11.
        assert_eq!(vertices[1], Point3::new(11.0, 0.0, 0.0));

        assert_eq!(
            store.entity(a).unwrap().materials,
            vec![Some("steel".to_string())]
        );
        // Extents refreshed from the merged geometry.
        assert_eq!(store.entity(a).unwrap().dimensions.x, 11.0);
    }

    #[test]
    fn test_merge_copies_shared_mesh_for_primary() {
        let mut store = SceneStore::new();
        let a = store.add_entity("A", Point3::origin());
        let bystander = store.add_entity("B", Point3::new(5.0, 0.0, 0.0));
        let c = store.add_entity("C", Point3::new(10.0, 0.0, 0.0));
        store
            .attach_mesh(a, MeshData::new(vec![Point3::origin()]))
            .unwrap();
        store
            .attach_mesh(c, MeshData::new(vec![Point3::origin()]))
            .unwrap();
        store.share_mesh(a, &[bystander]).unwrap();
        let shared = store.entity(bystander).unwrap().mesh().unwrap();

        store.merge_entities(&[a, c]).unwrap();

        // The bystander still points at the untouched original record.
        assert_eq!(store.entity(bystander).unwrap().mesh(), Some(shared));
        assert_eq!(store.mesh(shared).unwrap().vertices.len(), 1);

        // The primary absorbed C into a copy of its own.
        let merged = store.entity(a).unwrap().mesh().unwrap();
        assert_ne!(merged, shared);
        assert_eq!(store.mesh(merged).unwrap().vertices.len(), 2);
    }

    #[test]
    fn test_merge_rejects_stale_entity() {
        let (mut store, ids) = store_with_entities(2);
        store.remove_entity(ids[1]).unwrap();
        let err = store.merge_entities(&[ids[0], ids[1]]).unwrap_err();
        assert!(matches!(err, ScenesortError::Operation { .. }));
    }

    #[test]
    fn test_merge_single_entity_is_noop() {
        let (mut store, ids) = store_with_entities(1);
        let survivor = store.merge_entities(&[ids[0]]).unwrap();
        assert_eq!(survivor, ids[0]);
        assert_eq!(store.entity_count(), 1);
    }
}
