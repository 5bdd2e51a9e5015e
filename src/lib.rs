//! # Scenesort-RS: Scene Cleanup Engine for CAD-Derived Imports
//!
//! A Rust implementation of an object grouping and rule-driven action engine
//! for cleaning up imported CAD geometry inside a 3D content-authoring host.
//! This library provides:
//!
//! - **Proximity Clustering**: axis-masked connectivity partitioning so
//!   nearby loose parts can be merged
//! - **Geometry Deduplication**: fingerprint-based duplicate detection that
//!   links equivalent meshes to one shared record
//! - **Pattern Detection**: naming-template inference over hundreds of
//!   exporter-stamped entity names
//! - **Rule Engine**: ordered organize/rename/join/delete rules applied
//!   against a hierarchical container store
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        API Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Core          │  Detectors      │  Rules                  │
//! │                │                 │                         │
//! │ • SceneStore   │ • Proximity     │ • RuleEngine            │
//! │ • Config       │ • Dedupe        │ • ContainerResolver     │
//! │ • Errors       │ • Patterns      │                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use nalgebra::Point3;
//! use scenesort_rs::{
//!     PatternRule, RuleAction, RulesConfig, SceneStore, ScenesortConfig, ScenesortEngine,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = SceneStore::new();
//!     let wall = store.add_entity("Wall_01", Point3::origin());
//!     let door = store.add_entity("Door_01", Point3::new(4.0, 0.0, 0.0));
//!
//!     let config = ScenesortConfig {
//!         rules: RulesConfig::default()
//!             .with_rule(PatternRule::new("Wall", RuleAction::Organize).with_output("Walls"))
//!             .with_rule(PatternRule::new("Door", RuleAction::Organize).with_output("Doors")),
//!         ..Default::default()
//!     };
//!
//!     let engine = ScenesortEngine::new(config)?;
//!     let report = engine.apply_rules(&mut store, &[wall, door])?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! The engine is synchronous and single-threaded: the host invokes one pass
//! at a time and the engine assumes exclusive access to the store for the
//! duration of the call. There is no rollback; a failure mid-run leaves
//! earlier mutations applied, matching the host's own undo model.

#![warn(missing_docs)]
#![warn(unsafe_code)]

// Core data model and shared infrastructure
pub mod core {
    //! Scene data model, configuration, and error types.

    pub mod config;
    pub mod errors;
    pub mod scene;
}

// Grouping and inference passes
pub mod detectors {
    //! Clustering, deduplication, and pattern inference.

    pub mod dedupe;
    pub mod patterns;
    pub mod proximity;
}

// Rule-driven batch actions
pub mod rules {
    //! Ordered rule application and container resolution.

    pub mod engine;
    pub mod resolver;
}

// Public API and engine interface
pub mod api {
    //! High-level API and engine interface.

    pub mod engine;
    pub mod results;
}

// Re-export primary types for convenience
pub use api::engine::ScenesortEngine;
pub use api::results::{
    ClusterReport, DedupeReport, PatternReport, ProximityJoinReport, RuleRunReport,
};
pub use core::config::{
    AxisMask, DedupeConfig, DedupeMode, ProximityConfig, RulesConfig, ScenesortConfig,
};
pub use core::errors::{Result, ScenesortError};
pub use core::scene::{Container, ContainerId, Entity, EntityId, MeshData, MeshId, SceneStore};
pub use detectors::dedupe::{Deduplicator, DuplicateGroup, Fingerprint, GeometryFingerprinter};
pub use detectors::patterns::PatternDetector;
pub use detectors::proximity::{Cluster, SpatialClusterer};
pub use rules::engine::{PatternRule, RuleAction, RuleEngine, RuleOutcome, RuleStatus};
pub use rules::resolver::ContainerResolver;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
