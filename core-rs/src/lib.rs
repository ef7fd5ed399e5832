//! # IPM Core - Ingest Package Manager
//!
//! Assigns domain-profile node types to a tree of content nodes, validates the
//! tree against the profile's structural constraints, and re-types nodes through
//! authored transforms.
//!
//! ## Core Principle
//!
//! **The profile decides, the tree records**: a `DomainProfile` is immutable
//! data describing which node types may sit where. A `ContentTree` only stores
//! the types, edge relations and object references the engine derived from it.
//!
//! ## Key Features
//!
//! - Declarative profiles with parent, child and property constraints
//! - Deterministic top-down type assignment with subtree search
//! - Whole-tree and local validation with per-node violation reports
//! - Preconditioned, reversible node transforms
//! - Pluggable domain-object stores (in-memory or Oxigraph RDF)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   scan    ┌──────────────┐
//! │  filesystem  │ ────────▶ │ ContentTree  │
//! └──────────────┘           └──────┬───────┘
//!                                   │ assign / validate / transform
//!                          ┌────────▼────────┐      ┌──────────────┐
//!                          │  ProfileEngine  │ ───▶ │ ObjectStore  │
//!                          └────────▲────────┘      └──────────────┘
//!                                   │
//!                          ┌────────┴────────┐
//!                          │  DomainProfile  │
//!                          └─────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod profile;
pub mod storage;
pub mod tree;

pub use config::{AssignmentConfig, EngineConfig, ScannerConfig};
pub use engine::{
    AssignmentReport, Placement, ProfileEngine, PropertyViolation, ValidationReport, Violation,
    ViolationKind,
};
pub use errors::IpmError;
pub use profile::{
    Cardinality, DomainProfile, DomainProfileBuilder, FileAssociation, NodeConstraint,
    NodeTransform, NodeType, NodeTypeId, ProfileCatalog, ProfileError, PropertyConstraint,
    PropertyType, PropertyTypeId, RelationId, StructuralRelation, TransformId,
};
pub use storage::{InMemoryObjectStore, ObjectStore, RdfObjectStore};
pub use tree::{ContentNode, ContentTree, FileInfo, FileKind, FilesystemScanner, NodeId, TreeSource};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
