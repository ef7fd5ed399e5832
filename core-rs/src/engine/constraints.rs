//! Constraint evaluation primitives
//!
//! Stateless functions over the tree and profile. Nothing here touches the
//! object store except `property_violations`, which only reads counts.

use serde::Serialize;
use std::fmt;

use crate::errors::Result;
use crate::profile::{
    Cardinality, DomainProfile, NodeConstraint, NodeTypeId, PropertyTypeId, RelationId,
};
use crate::storage::ObjectStore;
use crate::tree::{ContentTree, NodeId};

/// One structural edge as seen from a node: the type at the other end and the
/// relation recorded for the edge
pub type Edge = (Option<NodeTypeId>, Option<RelationId>);

/// Evaluate a constraint against the edges of one side of a node
///
/// Positive constraints need at least one covered edge; negative ones need none.
pub fn evaluate<I>(constraint: &NodeConstraint, edges: I) -> bool
where
    I: IntoIterator<Item = Edge>,
{
    let mut covered = edges
        .into_iter()
        .filter(|(other, relation)| constraint.covers_edge(*other, *relation));
    let any = covered.next().is_some();
    if constraint.matches_none {
        !any
    } else {
        any
    }
}

/// The edge to the node's parent, if it has one
pub fn parent_edge(tree: &ContentTree, node: NodeId) -> Option<Edge> {
    let current = tree.get(node)?;
    let parent = tree.get(current.parent()?)?;
    Some((parent.node_type, current.parent_relation))
}

/// Edges to the node's children, skipping ignored children
pub fn child_edges(tree: &ContentTree, node: NodeId) -> Vec<Edge> {
    tree.children(node)
        .iter()
        .filter_map(|c| tree.get(*c))
        .filter(|c| !c.ignored)
        .map(|c| (c.node_type, c.parent_relation))
        .collect()
}

/// Does the node's actual parent edge satisfy `constraint`?
///
/// For `NodeConstraint::none()` this is true exactly when the node is a root.
pub fn matches_parent(constraint: &NodeConstraint, tree: &ContentTree, node: NodeId) -> bool {
    evaluate(constraint, parent_edge(tree, node))
}

/// Do the node's child edges satisfy `constraint`?
///
/// A negative constraint must hold for every child: none may form the
/// forbidden edge.
pub fn matches_child(constraint: &NodeConstraint, tree: &ContentTree, node: NodeId) -> bool {
    evaluate(constraint, child_edges(tree, node))
}

/// Number of children whose edge falls under `constraint`
pub fn count_matching_children(constraint: &NodeConstraint, tree: &ContentTree, node: NodeId) -> usize {
    child_edges(tree, node)
        .into_iter()
        .filter(|(other, relation)| constraint.covers_edge(*other, *relation))
        .count()
}

/// Index of the first parent constraint of the node's type that holds
pub fn satisfied_parent_constraint(
    profile: &DomainProfile,
    tree: &ContentTree,
    node: NodeId,
) -> Option<usize> {
    let node_type = profile.get_node_type(tree.get(node)?.node_type?)?;
    node_type
        .parent_constraints
        .iter()
        .position(|c| matches_parent(c, tree, node))
}

/// At least one parent constraint of the node's type holds
///
/// Untyped nodes and types without parent constraints never satisfy this.
pub fn satisfies_any_parent_constraint(profile: &DomainProfile, tree: &ContentTree, node: NodeId) -> bool {
    satisfied_parent_constraint(profile, tree, node).is_some()
}

/// Parent constraint under which `candidate` could sit below a parent of
/// `parent_type` (`None` = no parent at all)
///
/// Roots need the `none()` shape; children need a positive constraint naming
/// the parent's type (or any type). The returned constraint's relation is the
/// one recorded for the edge.
pub fn placement(
    profile: &DomainProfile,
    candidate: NodeTypeId,
    parent_type: Option<NodeTypeId>,
) -> Option<&NodeConstraint> {
    let constraints = &profile.get_node_type(candidate)?.parent_constraints;
    match parent_type {
        None => constraints.iter().find(|c| c.allows_no_parent()),
        Some(parent) => constraints
            .iter()
            .find(|c| !c.matches_none && c.node_type.map_or(true, |t| t == parent)),
    }
}

/// Child constraints of `node_type` that `edges` violate, with the number of
/// covered edges
///
/// Positive constraints must see a count inside their cardinality; negative
/// ones must cover no edge at all.
pub fn child_constraint_violations<'p>(
    profile: &'p DomainProfile,
    node_type: NodeTypeId,
    edges: &[Edge],
) -> Vec<(&'p NodeConstraint, usize)> {
    let Some(definition) = profile.get_node_type(node_type) else {
        return Vec::new();
    };
    definition
        .child_constraints
        .iter()
        .filter_map(|c| {
            let count = edges
                .iter()
                .filter(|(other, relation)| c.covers_edge(*other, *relation))
                .count();
            let holds = if c.matches_none {
                count == 0
            } else {
                c.cardinality.contains(count)
            };
            (!holds).then_some((c, count))
        })
        .collect()
}

/// A property constraint the domain object does not meet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyViolation {
    pub node: NodeId,
    pub property_type: PropertyTypeId,
    pub property: String,
    pub cardinality: Cardinality,
    pub actual: usize,
}

impl fmt::Display for PropertyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} has {} value(s), expected {}",
            self.node, self.property, self.actual, self.cardinality
        )
    }
}

/// Compare the property counts held for the node's domain object against the
/// property constraints of `candidate`
///
/// A node without a domain object counts zero for every property.
pub fn property_violations<S: ObjectStore + ?Sized>(
    profile: &DomainProfile,
    store: &S,
    tree: &ContentTree,
    node: NodeId,
    candidate: NodeTypeId,
) -> Result<Vec<PropertyViolation>> {
    let content = tree.node(node)?;
    let Some(definition) = profile.get_node_type(candidate) else {
        return Ok(Vec::new());
    };

    let mut violations = Vec::new();
    for constraint in &definition.property_constraints {
        let property = &profile.property_type(constraint.property_type).identifier;
        let actual = match content.domain_object.as_deref() {
            Some(object) => store.property_count(object, property)?,
            None => 0,
        };
        if !constraint.cardinality.contains(actual) {
            violations.push(PropertyViolation {
                node,
                property_type: constraint.property_type,
                property: property.clone(),
                cardinality: constraint.cardinality,
                actual,
            });
        }
    }
    Ok(violations)
}
