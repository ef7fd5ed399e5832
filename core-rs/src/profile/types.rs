//! Profile data model - relations, constraints, node types, transforms
//!
//! Every element is owned by exactly one `DomainProfile` and addressed through a
//! small `Copy` handle scoped to that profile. Handles compare by index, so type
//! equality checks never touch strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tree::FileKind;

macro_rules! profile_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Position of the element in its profile's declaration order
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

profile_handle!(
    /// Handle to a `StructuralRelation` inside one profile
    RelationId,
    "relation"
);
profile_handle!(
    /// Handle to a `PropertyType` inside one profile
    PropertyTypeId,
    "property"
);
profile_handle!(
    /// Handle to a `NodeType` inside one profile
    NodeTypeId,
    "type"
);
profile_handle!(
    /// Handle to a `NodeTransform` inside one profile
    TransformId,
    "transform"
);

/// Directed predicate pair describing a parent/child edge
///
/// `forward` reads child -> parent (e.g. `pcdm:memberOf`), `inverse` reads
/// parent -> child (e.g. `pcdm:hasMember`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructuralRelation {
    pub forward_predicate: String,
    pub inverse_predicate: String,
}

/// Property that a domain object may carry (e.g. `dcterms:title`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyType {
    pub identifier: String,
    pub label: String,
    pub description: String,
}

/// Inclusive `[min, max]` bound; `max == None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    pub max: Option<u32>,
}

impl Cardinality {
    /// `[0, unbounded]`
    pub const ANY: Cardinality = Cardinality { min: 0, max: None };

    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Exactly `n` occurrences
    pub fn exactly(n: u32) -> Self {
        Self { min: n, max: Some(n) }
    }

    /// At least `n` occurrences
    pub fn at_least(n: u32) -> Self {
        Self { min: n, max: None }
    }

    /// Build from the signed convention where `-1` means unbounded
    pub fn from_signed(min: i64, max: i64) -> Option<Self> {
        if min < 0 || max < -1 || (max >= 0 && max < min) {
            return None;
        }
        let max = if max == -1 { None } else { Some(max as u32) };
        Some(Self { min: min as u32, max })
    }

    pub fn contains(&self, count: usize) -> bool {
        let count = count as u64;
        count >= u64::from(self.min) && self.max.map_or(true, |max| count <= u64::from(max))
    }

    pub fn is_required(&self) -> bool {
        self.min > 0
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, *]", self.min),
        }
    }
}

/// Rule about the presence (or absence) of a structural edge
///
/// An absent `node_type` or `relation` matches any type or relation. With
/// `matches_none` set the constraint holds when no edge matching the rest of the
/// constraint exists. `cardinality` is only consulted for child constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeConstraint {
    pub node_type: Option<NodeTypeId>,
    pub relation: Option<RelationId>,
    pub matches_none: bool,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl NodeConstraint {
    /// Edge to a node of `node_type` via `relation` must exist
    pub fn allow(node_type: NodeTypeId, relation: RelationId) -> Self {
        Self {
            node_type: Some(node_type),
            relation: Some(relation),
            matches_none: false,
            cardinality: Cardinality::ANY,
        }
    }

    /// No edge at all; as a parent constraint this is "may be a root"
    pub fn none() -> Self {
        Self {
            node_type: None,
            relation: None,
            matches_none: true,
            cardinality: Cardinality::ANY,
        }
    }

    /// No edge to a node of `node_type` via `relation` may exist
    pub fn disallow(node_type: NodeTypeId, relation: RelationId) -> Self {
        Self {
            node_type: Some(node_type),
            relation: Some(relation),
            matches_none: true,
            cardinality: Cardinality::ANY,
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// True for the `none()` shape: negative and not tied to a type
    pub fn allows_no_parent(&self) -> bool {
        self.matches_none && self.node_type.is_none()
    }

    /// Does an edge to a node of `other` through `relation` fall under this
    /// constraint (ignoring `matches_none`)?
    pub fn covers_edge(&self, other: Option<NodeTypeId>, relation: Option<RelationId>) -> bool {
        let type_ok = match self.node_type {
            None => true,
            Some(required) => other == Some(required),
        };
        let relation_ok = match self.relation {
            None => true,
            Some(required) => relation == Some(required),
        };
        type_ok && relation_ok
    }
}

/// Cardinality binding of a property type to a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyConstraint {
    pub property_type: PropertyTypeId,
    pub cardinality: Cardinality,
}

/// Whether a node type belongs on directories, regular files or either
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileAssociation {
    Directory,
    RegularFile,
    Either,
}

impl FileAssociation {
    /// Nodes without file information (virtual nodes) accept every association
    pub fn accepts(self, kind: Option<FileKind>) -> bool {
        match (self, kind) {
            (_, None) | (FileAssociation::Either, _) => true,
            (FileAssociation::Directory, Some(FileKind::Directory)) => true,
            (FileAssociation::RegularFile, Some(FileKind::RegularFile)) => true,
            _ => false,
        }
    }

    /// Could a node of one association ever be re-typed to the other?
    pub fn compatible_with(self, other: FileAssociation) -> bool {
        self == other || self == FileAssociation::Either || other == FileAssociation::Either
    }
}

impl fmt::Display for FileAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileAssociation::Directory => "directory",
            FileAssociation::RegularFile => "regular file",
            FileAssociation::Either => "either",
        };
        f.write_str(label)
    }
}

/// Named, profile-scoped node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    pub identifier: String,
    pub label: String,
    pub description: String,
    /// RDF classes written onto the domain object of nodes of this type
    pub domain_types: Vec<String>,
    pub file_association: FileAssociation,
    pub parent_constraints: Vec<NodeConstraint>,
    pub child_constraints: Vec<NodeConstraint>,
    pub property_constraints: Vec<PropertyConstraint>,
    /// Identifier of the owning profile
    pub domain_profile: String,
}

impl NodeType {
    /// Nodes of a type without domain types stay purely structural
    pub fn is_structural(&self) -> bool {
        self.domain_types.is_empty()
    }

    /// Declares a parent constraint of the `none()` shape
    pub fn may_be_root(&self) -> bool {
        self.parent_constraints.iter().any(NodeConstraint::allows_no_parent)
    }
}

/// Authored, preconditioned re-typing of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    pub label: String,
    pub description: String,
    pub source_node_type: NodeTypeId,
    pub source_parent_constraint: Option<NodeConstraint>,
    pub source_child_constraints: Vec<NodeConstraint>,
    pub result_node_type: NodeTypeId,
}
