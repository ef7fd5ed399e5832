/**
 * profile module
 *
 * - types: relations, constraints, node types, transforms and their handles
 * - domain: immutable DomainProfile and its validating builder
 * - catalog: load-once set of profiles, passed around explicitly
 * - pcdm: built-in Portland Common Data Model profile
 */

pub mod catalog;
pub mod domain;
pub mod pcdm;
pub mod types;

pub use catalog::ProfileCatalog;
pub use domain::{DomainProfile, DomainProfileBuilder, ProfileError};
pub use types::{
    Cardinality, FileAssociation, NodeConstraint, NodeTransform, NodeType, NodeTypeId,
    PropertyConstraint, PropertyType, PropertyTypeId, RelationId, StructuralRelation, TransformId,
};
