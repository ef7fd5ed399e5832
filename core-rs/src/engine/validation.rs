//! Tree validation
//!
//! A tree is valid when every active node is typed with a type of the engine's
//! profile, the type accepts the node's file kind, at least one of its parent
//! constraints holds, and none of its child constraints is violated.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use super::constraints::{child_constraint_violations, child_edges, satisfies_any_parent_constraint};
use super::{active_subtree, is_excluded, ProfileEngine};
use crate::errors::{IpmError, Result};
use crate::profile::{DomainProfile, FileAssociation, NodeConstraint, NodeTypeId};
use crate::storage::ObjectStore;
use crate::tree::{ContentTree, FileKind, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    Untyped,
    /// The node carries a type handle the profile does not define
    UnknownType { node_type: NodeTypeId },
    FileAssociationMismatch {
        node_type: String,
        expected: FileAssociation,
        actual: Option<FileKind>,
    },
    NoParentConstraintSatisfied { node_type: String },
    ChildConstraint {
        node_type: String,
        constraint: NodeConstraint,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub node: NodeId,
    /// Path of names below the root
    pub path: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() { "/" } else { self.path.as_str() };
        match &self.kind {
            ViolationKind::Untyped => write!(f, "{}: untyped", at),
            ViolationKind::UnknownType { node_type } => write!(f, "{}: unknown type {}", at, node_type),
            ViolationKind::FileAssociationMismatch { node_type, expected, .. } => {
                write!(f, "{}: {} requires a {} node", at, node_type, expected)
            }
            ViolationKind::NoParentConstraintSatisfied { node_type } => {
                write!(f, "{}: no parent constraint of {} holds", at, node_type)
            }
            ViolationKind::ChildConstraint {
                node_type,
                constraint,
                actual,
            } => {
                if constraint.matches_none {
                    write!(f, "{}: {} forbids {} matching child(ren)", at, node_type, actual)
                } else {
                    write!(
                        f,
                        "{}: {} has {} matching child(ren), expected {}",
                        at, node_type, actual, constraint.cardinality
                    )
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Number of nodes examined
    pub checked: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Nodes with at least one violation, in report order
    pub fn offending_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = Vec::new();
        for v in &self.violations {
            if !nodes.contains(&v.node) {
                nodes.push(v.node);
            }
        }
        nodes
    }

    /// First violation as a `ConstraintViolation` error
    pub fn into_result(self, tree: &ContentTree) -> Result<()> {
        match self.violations.into_iter().next() {
            None => Ok(()),
            Some(v) => Err(IpmError::ConstraintViolation {
                node: tree
                    .get(v.node)
                    .map_or_else(|| v.node.to_string(), |n| n.identifier.clone()),
                detail: v.to_string(),
            }),
        }
    }
}

/// Violations of a single node; ignored nodes have none
pub fn check_node(profile: &DomainProfile, tree: &ContentTree, node: NodeId) -> Vec<Violation> {
    let Some(content) = tree.get(node) else {
        return Vec::new();
    };
    if content.ignored {
        return Vec::new();
    }

    let violation = |kind| Violation {
        node,
        path: tree.path_of(node),
        kind,
    };
    let Some(primary) = content.node_type else {
        return vec![violation(ViolationKind::Untyped)];
    };
    let Some(definition) = profile.get_node_type(primary) else {
        return vec![violation(ViolationKind::UnknownType { node_type: primary })];
    };

    let mut out = Vec::new();
    for id in std::iter::once(primary).chain(content.sub_node_types.iter().copied()) {
        match profile.get_node_type(id) {
            None => out.push(violation(ViolationKind::UnknownType { node_type: id })),
            Some(t) if !t.file_association.accepts(content.file_kind()) => {
                out.push(violation(ViolationKind::FileAssociationMismatch {
                    node_type: t.label.clone(),
                    expected: t.file_association,
                    actual: content.file_kind(),
                }))
            }
            Some(_) => {}
        }
    }

    if !satisfies_any_parent_constraint(profile, tree, node) {
        out.push(violation(ViolationKind::NoParentConstraintSatisfied {
            node_type: definition.label.clone(),
        }));
    }

    let edges = child_edges(tree, node);
    for (constraint, actual) in child_constraint_violations(profile, primary, &edges) {
        out.push(violation(ViolationKind::ChildConstraint {
            node_type: definition.label.clone(),
            constraint: *constraint,
            actual,
        }));
    }
    out
}

/// Check `root` and its active subtree
pub fn validation_report(profile: &DomainProfile, tree: &ContentTree, root: NodeId) -> ValidationReport {
    let nodes = active_subtree(tree, root);
    let violations = nodes
        .iter()
        .flat_map(|n| check_node(profile, tree, *n))
        .collect();
    ValidationReport {
        checked: nodes.len(),
        violations,
    }
}

/// Check only `node`, its parent and its children
///
/// Enough after a local edit: a node's validity depends only on its own edges.
pub fn revalidate_around(profile: &DomainProfile, tree: &ContentTree, node: NodeId) -> ValidationReport {
    let mut nodes: Vec<NodeId> = Vec::new();
    if let Some(parent) = tree.parent(node) {
        nodes.push(parent);
    }
    nodes.push(node);
    nodes.extend(tree.children(node).iter().copied());
    nodes.retain(|n| !is_excluded(tree, *n));

    let violations = nodes
        .iter()
        .flat_map(|n| check_node(profile, tree, *n))
        .collect();
    ValidationReport {
        checked: nodes.len(),
        violations,
    }
}

impl<S: ObjectStore> ProfileEngine<S> {
    /// True when the subtree at `root` satisfies every constraint
    ///
    /// A tree bound to another profile is never valid for this engine.
    pub fn validate_tree(&self, tree: &ContentTree, root: NodeId) -> bool {
        match self.validation_report(tree, root) {
            Ok(report) => report.is_valid(),
            Err(e) => {
                debug!(error = %e, "Validation skipped");
                false
            }
        }
    }

    pub fn validation_report(&self, tree: &ContentTree, root: NodeId) -> Result<ValidationReport> {
        self.check_binding(tree)?;
        tree.node(root)?;
        let report = validation_report(&self.profile, tree, root);
        debug!(
            checked = report.checked,
            violations = report.violations.len(),
            "Validated subtree"
        );
        Ok(report)
    }

    /// Local re-check after an edit touching `node`
    pub fn revalidate_around(&self, tree: &ContentTree, node: NodeId) -> Result<ValidationReport> {
        self.check_binding(tree)?;
        tree.node(node)?;
        Ok(revalidate_around(&self.profile, tree, node))
    }
}
