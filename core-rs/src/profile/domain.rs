/**
 * domain.rs
 * Immutable domain profile and the builder that validates it
 */

use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

use super::types::{
    FileAssociation, NodeConstraint, NodeTransform, NodeType, NodeTypeId, PropertyConstraint,
    PropertyType, PropertyTypeId, RelationId, StructuralRelation, TransformId,
};
use crate::tree::FileKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("Identifier is not an absolute IRI: {0}")]
    InvalidIdentifier(String),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    #[error("Invalid cardinality: {0}")]
    InvalidCardinality(String),

    #[error("Invalid transform '{label}': {reason}")]
    InvalidTransform { label: String, reason: String },
}

/// Closed schema of node types, transforms and property types
///
/// Constructed once through `DomainProfileBuilder` and read-only afterwards;
/// share it across trees behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainProfile {
    identifier: String,
    domain_identifier: String,
    label: String,
    relations: Vec<StructuralRelation>,
    node_types: Vec<NodeType>,
    node_transforms: Vec<NodeTransform>,
    property_types: Vec<PropertyType>,
}

impl DomainProfile {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn domain_identifier(&self) -> &str {
        &self.domain_identifier
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn node_type(&self, id: NodeTypeId) -> &NodeType {
        &self.node_types[id.index()]
    }

    pub fn get_node_type(&self, id: NodeTypeId) -> Option<&NodeType> {
        self.node_types.get(id.index())
    }

    pub fn relation(&self, id: RelationId) -> &StructuralRelation {
        &self.relations[id.index()]
    }

    pub fn property_type(&self, id: PropertyTypeId) -> &PropertyType {
        &self.property_types[id.index()]
    }

    pub fn transform(&self, id: TransformId) -> &NodeTransform {
        &self.node_transforms[id.index()]
    }

    pub fn get_transform(&self, id: TransformId) -> Option<&NodeTransform> {
        self.node_transforms.get(id.index())
    }

    /// Node types in declaration order
    pub fn node_types(&self) -> impl Iterator<Item = (NodeTypeId, &NodeType)> {
        self.node_types
            .iter()
            .enumerate()
            .map(|(i, t)| (NodeTypeId(i as u32), t))
    }

    /// Transforms in declaration order
    pub fn transforms(&self) -> impl Iterator<Item = (TransformId, &NodeTransform)> {
        self.node_transforms
            .iter()
            .enumerate()
            .map(|(i, t)| (TransformId(i as u32), t))
    }

    pub fn relations(&self) -> impl Iterator<Item = (RelationId, &StructuralRelation)> {
        self.relations
            .iter()
            .enumerate()
            .map(|(i, r)| (RelationId(i as u32), r))
    }

    pub fn property_types(&self) -> impl Iterator<Item = (PropertyTypeId, &PropertyType)> {
        self.property_types
            .iter()
            .enumerate()
            .map(|(i, p)| (PropertyTypeId(i as u32), p))
    }

    pub fn node_type_count(&self) -> usize {
        self.node_types.len()
    }

    pub fn find_node_type(&self, identifier: &str) -> Option<NodeTypeId> {
        self.node_types
            .iter()
            .position(|t| t.identifier == identifier)
            .map(|i| NodeTypeId(i as u32))
    }

    /// Looks a node type up by its label, e.g. `"Collection"`
    pub fn find_node_type_by_label(&self, label: &str) -> Option<NodeTypeId> {
        self.node_types
            .iter()
            .position(|t| t.label == label)
            .map(|i| NodeTypeId(i as u32))
    }

    pub fn find_transform(&self, label: &str) -> Option<TransformId> {
        self.node_transforms
            .iter()
            .position(|t| t.label == label)
            .map(|i| TransformId(i as u32))
    }

    pub fn find_relation(&self, forward_predicate: &str) -> Option<RelationId> {
        self.relations
            .iter()
            .position(|r| r.forward_predicate == forward_predicate)
            .map(|i| RelationId(i as u32))
    }

    pub fn find_property_type(&self, identifier: &str) -> Option<PropertyTypeId> {
        self.property_types
            .iter()
            .position(|p| p.identifier == identifier)
            .map(|i| PropertyTypeId(i as u32))
    }

    /// Node types whose file association accepts `kind`, in declaration order
    pub fn types_for_kind(&self, kind: Option<FileKind>) -> impl Iterator<Item = NodeTypeId> + '_ {
        self.node_types()
            .filter(move |(_, t)| t.file_association.accepts(kind))
            .map(|(id, _)| id)
    }

    /// Transforms whose source is `source`, in declaration order
    pub fn transforms_from(&self, source: NodeTypeId) -> impl Iterator<Item = TransformId> + '_ {
        self.transforms()
            .filter(move |(_, t)| t.source_node_type == source)
            .map(|(id, _)| id)
    }

    /// Domain types of `primary` followed by those of `secondary`, without duplicates
    pub fn domain_types_for(&self, primary: NodeTypeId, secondary: &[NodeTypeId]) -> Vec<String> {
        let mut seen = HashSet::new();
        std::iter::once(primary)
            .chain(secondary.iter().copied())
            .flat_map(|id| self.node_type(id).domain_types.iter())
            .filter(|uri| seen.insert(uri.as_str()))
            .cloned()
            .collect()
    }
}

/// Builder for `DomainProfile`
///
/// Node types are declared first and receive their handle immediately, so
/// constraints can reference types declared later.
///
/// # Example
///
/// ```
/// use ipm_core::profile::{DomainProfileBuilder, FileAssociation, NodeConstraint};
///
/// let mut builder = DomainProfileBuilder::new(
///     "http://example.org/profile/flat",
///     "http://example.org/domain",
///     "Flat",
/// );
/// let part_of = builder.relation("http://example.org/partOf", "http://example.org/hasPart").unwrap();
/// let folder = builder.node_type("http://example.org/Folder", "Folder", FileAssociation::Directory).unwrap();
/// let doc = builder.node_type("http://example.org/Doc", "Doc", FileAssociation::RegularFile).unwrap();
/// builder.parent_constraint(folder, NodeConstraint::none());
/// builder.parent_constraint(doc, NodeConstraint::allow(folder, part_of));
/// let profile = builder.build().unwrap();
/// assert_eq!(profile.node_type_count(), 2);
/// ```
#[derive(Debug)]
pub struct DomainProfileBuilder {
    profile: DomainProfile,
}

impl DomainProfileBuilder {
    pub fn new(identifier: &str, domain_identifier: &str, label: &str) -> Self {
        Self {
            profile: DomainProfile {
                identifier: identifier.to_string(),
                domain_identifier: domain_identifier.to_string(),
                label: label.to_string(),
                relations: Vec::new(),
                node_types: Vec::new(),
                node_transforms: Vec::new(),
                property_types: Vec::new(),
            },
        }
    }

    pub fn relation(&mut self, forward: &str, inverse: &str) -> Result<RelationId, ProfileError> {
        check_iri(forward)?;
        check_iri(inverse)?;
        if self.profile.find_relation(forward).is_some() {
            return Err(ProfileError::DuplicateIdentifier(forward.to_string()));
        }
        self.profile.relations.push(StructuralRelation {
            forward_predicate: forward.to_string(),
            inverse_predicate: inverse.to_string(),
        });
        Ok(RelationId((self.profile.relations.len() - 1) as u32))
    }

    pub fn property_type(&mut self, identifier: &str, label: &str) -> Result<PropertyTypeId, ProfileError> {
        check_iri(identifier)?;
        if self.profile.find_property_type(identifier).is_some() {
            return Err(ProfileError::DuplicateIdentifier(identifier.to_string()));
        }
        self.profile.property_types.push(PropertyType {
            identifier: identifier.to_string(),
            label: label.to_string(),
            description: String::new(),
        });
        Ok(PropertyTypeId((self.profile.property_types.len() - 1) as u32))
    }

    pub fn node_type(
        &mut self,
        identifier: &str,
        label: &str,
        file_association: FileAssociation,
    ) -> Result<NodeTypeId, ProfileError> {
        check_iri(identifier)?;
        if self.profile.find_node_type(identifier).is_some() {
            return Err(ProfileError::DuplicateIdentifier(identifier.to_string()));
        }
        self.profile.node_types.push(NodeType {
            identifier: identifier.to_string(),
            label: label.to_string(),
            description: String::new(),
            domain_types: Vec::new(),
            file_association,
            parent_constraints: Vec::new(),
            child_constraints: Vec::new(),
            property_constraints: Vec::new(),
            domain_profile: self.profile.identifier.clone(),
        });
        Ok(NodeTypeId((self.profile.node_types.len() - 1) as u32))
    }

    pub fn describe(&mut self, id: NodeTypeId, description: &str) -> &mut Self {
        if let Some(t) = self.profile.node_types.get_mut(id.index()) {
            t.description = description.to_string();
        }
        self
    }

    pub fn domain_type(&mut self, id: NodeTypeId, uri: &str) -> &mut Self {
        if let Some(t) = self.profile.node_types.get_mut(id.index()) {
            t.domain_types.push(uri.to_string());
        }
        self
    }

    pub fn parent_constraint(&mut self, id: NodeTypeId, constraint: NodeConstraint) -> &mut Self {
        if let Some(t) = self.profile.node_types.get_mut(id.index()) {
            t.parent_constraints.push(constraint);
        }
        self
    }

    pub fn child_constraint(&mut self, id: NodeTypeId, constraint: NodeConstraint) -> &mut Self {
        if let Some(t) = self.profile.node_types.get_mut(id.index()) {
            t.child_constraints.push(constraint);
        }
        self
    }

    pub fn property_constraint(&mut self, id: NodeTypeId, constraint: PropertyConstraint) -> &mut Self {
        if let Some(t) = self.profile.node_types.get_mut(id.index()) {
            t.property_constraints.push(constraint);
        }
        self
    }

    pub fn transform(&mut self, transform: NodeTransform) -> Result<TransformId, ProfileError> {
        if self.profile.find_transform(&transform.label).is_some() {
            return Err(ProfileError::DuplicateIdentifier(transform.label));
        }
        self.profile.node_transforms.push(transform);
        Ok(TransformId((self.profile.node_transforms.len() - 1) as u32))
    }

    /// Validate every reference and freeze the profile
    pub fn build(self) -> Result<DomainProfile, ProfileError> {
        check_iri(&self.profile.identifier)?;
        check_iri(&self.profile.domain_identifier)?;

        let p = &self.profile;
        for node_type in &p.node_types {
            for constraint in node_type.parent_constraints.iter().chain(&node_type.child_constraints) {
                self.check_constraint(constraint, &node_type.identifier)?;
            }
            for pc in &node_type.property_constraints {
                if pc.property_type.index() >= p.property_types.len() {
                    return Err(ProfileError::DanglingReference(format!(
                        "{} references {}",
                        node_type.identifier, pc.property_type
                    )));
                }
                if let Some(max) = pc.cardinality.max {
                    if max < pc.cardinality.min {
                        return Err(ProfileError::InvalidCardinality(format!(
                            "{} on {}: {}",
                            p.property_types[pc.property_type.index()].identifier,
                            node_type.identifier,
                            pc.cardinality
                        )));
                    }
                }
            }
            for uri in &node_type.domain_types {
                check_iri(uri)?;
            }
        }

        for transform in &p.node_transforms {
            let invalid = |reason: String| ProfileError::InvalidTransform {
                label: transform.label.clone(),
                reason,
            };
            let source = p
                .node_types
                .get(transform.source_node_type.index())
                .ok_or_else(|| invalid(format!("unknown source {}", transform.source_node_type)))?;
            let result = p
                .node_types
                .get(transform.result_node_type.index())
                .ok_or_else(|| invalid(format!("unknown result {}", transform.result_node_type)))?;
            if transform.source_node_type == transform.result_node_type {
                return Err(invalid("source and result are the same type".to_string()));
            }
            if !source.file_association.compatible_with(result.file_association) {
                return Err(invalid(format!(
                    "{} nodes cannot become {} nodes",
                    source.file_association, result.file_association
                )));
            }
            for constraint in transform
                .source_parent_constraint
                .iter()
                .chain(&transform.source_child_constraints)
            {
                self.check_constraint(constraint, &transform.label)?;
            }
        }

        Ok(self.profile)
    }

    fn check_constraint(&self, constraint: &NodeConstraint, owner: &str) -> Result<(), ProfileError> {
        let p = &self.profile;
        if let Some(t) = constraint.node_type {
            if t.index() >= p.node_types.len() {
                return Err(ProfileError::DanglingReference(format!("{} references {}", owner, t)));
            }
        }
        if let Some(r) = constraint.relation {
            if r.index() >= p.relations.len() {
                return Err(ProfileError::DanglingReference(format!("{} references {}", owner, r)));
            }
        }
        if let Some(max) = constraint.cardinality.max {
            if max < constraint.cardinality.min {
                return Err(ProfileError::InvalidCardinality(format!(
                    "{} on {}",
                    constraint.cardinality, owner
                )));
            }
        }
        Ok(())
    }
}

fn check_iri(value: &str) -> Result<(), ProfileError> {
    // scheme ":" followed by at least one non-space character
    let iri = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s<>]+$")
        .map_err(|e| ProfileError::InvalidIdentifier(e.to_string()))?;
    if iri.is_match(value) {
        Ok(())
    } else {
        Err(ProfileError::InvalidIdentifier(value.to_string()))
    }
}
