//! Output-container resolution.
//!
//! Resolves (creating lazily where needed) the container a rule's selected
//! entities move into. The placement decision is a small fixed matrix over
//! the presence of a run-wide main container and a rule-level parent
//! container, kept as an explicit tagged dispatch so it stays auditable and
//! testable in isolation.

use crate::core::errors::Result;
use crate::core::scene::{ContainerId, SceneStore};

/// Where a newly created output container gets linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkTarget {
    /// Neither main nor parent configured: link under the scene root.
    Root,
    /// Only the run-wide main container configured.
    Main(ContainerId),
    /// Only the rule's explicit parent configured.
    Parent(ContainerId),
    /// Both configured: the parent itself must sit under main, then the
    /// output container links under the parent.
    ParentUnderMain {
        parent: ContainerId,
        main: ContainerId,
    },
}

/// Resolver for rule output containers.
#[derive(Debug, Default)]
pub struct ContainerResolver;

impl ContainerResolver {
    /// Resolve the output container for a rule.
    ///
    /// An existing container with the output name is reused unconditionally;
    /// parent and main are ignored in that case. Otherwise the container is
    /// created and linked per the placement matrix. Parent and main
    /// containers referenced by name are themselves created lazily.
    pub fn resolve(
        store: &mut SceneStore,
        output: &str,
        parent: Option<&str>,
        main: Option<&str>,
    ) -> Result<ContainerId> {
        if let Some(existing) = store.container_by_name(output) {
            return Ok(existing);
        }

        let target = match (main, parent) {
            (None, None) => LinkTarget::Root,
            (Some(main), None) => LinkTarget::Main(store.get_or_create_container(main)),
            (None, Some(parent)) => LinkTarget::Parent(store.get_or_create_container(parent)),
            (Some(main), Some(parent)) => {
                let main = store.get_or_create_container(main);
                let parent = store.get_or_create_container(parent);
                LinkTarget::ParentUnderMain { parent, main }
            }
        };

        let created = store.get_or_create_container(output);
        match target {
            LinkTarget::Root => {}
            LinkTarget::Main(main) => store.link_container(created, main)?,
            LinkTarget::Parent(parent) => store.link_container(created, parent)?,
            LinkTarget::ParentUnderMain { parent, main } => {
                if store.container(parent)?.parent() != Some(main) {
                    store.link_container(parent, main)?;
                }
                store.link_container(created, parent)?;
            }
        }
        Ok(created)
    }
}
