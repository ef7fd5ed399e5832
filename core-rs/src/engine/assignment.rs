//! Top-down node type assignment
//!
//! Assignment happens in two steps. The planner decides a type for every
//! active node of the subtree without touching the tree, then the engine
//! writes the plan and brings the domain objects in line.
//!
//! For each node the candidates are tried in profile declaration order. A
//! candidate is taken when it accepts the node's file kind, may sit below the
//! parent's type, and every child can in turn be given its own first viable
//! candidate below it. Viability is decided once per `(node, type)`, bottom-up
//! from the leaves, so no subtree is searched twice and tree depth never
//! grows the call stack. Siblings never influence each other: once a child's
//! first viable candidate is found, no other combination of sibling choices
//! is explored.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::constraints::{child_constraint_violations, placement, Edge};
use super::{active_subtree, is_excluded, ProfileEngine};
use crate::errors::{IpmError, Result};
use crate::profile::{DomainProfile, NodeTypeId, RelationId};
use crate::storage::ObjectStore;
use crate::tree::{ContentTree, FileKind, NodeId};

/// Type (and edge relation) decided for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub node: NodeId,
    pub node_type: NodeTypeId,
    pub relation: Option<RelationId>,
}

/// Outcome of a successful assignment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    pub placements: Vec<Placement>,
    /// Nodes that hold a domain object after the run
    pub objects: usize,
}

impl AssignmentReport {
    pub fn typed(&self) -> usize {
        self.placements.len()
    }
}

pub(crate) enum Plan {
    Complete(Vec<Placement>),
    Blocked {
        /// Best-effort placements for the parts that could be typed
        placements: Vec<Placement>,
        /// Active nodes left without a type
        untyped: Vec<NodeId>,
        blocked: NodeId,
        reason: String,
    },
}

pub(crate) struct Planner<'a> {
    profile: &'a DomainProfile,
    tree: &'a ContentTree,
    /// Can `node` take `type` with its whole active subtree typed below it?
    memo: HashMap<(NodeId, NodeTypeId), bool>,
}

impl<'a> Planner<'a> {
    pub(crate) fn new(profile: &'a DomainProfile, tree: &'a ContentTree) -> Self {
        Self {
            profile,
            tree,
            memo: HashMap::new(),
        }
    }

    /// Plan types for `start` and its active subtree below a parent of `parent_type`
    pub(crate) fn plan(&mut self, start: NodeId, parent_type: Option<NodeTypeId>) -> Plan {
        self.evaluate(start);
        if let Some((node_type, relation)) = self.choose(start, parent_type) {
            return Plan::Complete(self.collect(start, node_type, relation));
        }

        let (blocked, reason) = self.diagnose(start, parent_type);
        let (placements, untyped) = self.best_effort(start, parent_type);
        Plan::Blocked {
            placements,
            untyped,
            blocked,
            reason,
        }
    }

    /// Fill the viability table for every active node below `start`, children
    /// before their parents
    ///
    /// Walks a reversed pre-order instead of recursing, so tree depth is only
    /// bounded by memory.
    fn evaluate(&mut self, start: NodeId) {
        let profile = self.profile;
        for node in active_subtree(self.tree, start).into_iter().rev() {
            let kind = self.tree.get(node).and_then(|n| n.file_kind());
            let children = self.active_children(node);
            for node_type in profile.types_for_kind(kind) {
                let mut edges: Vec<Edge> = Vec::with_capacity(children.len());
                let mut ok = true;
                for child in &children {
                    match self.choose(*child, Some(node_type)) {
                        Some((child_type, relation)) => edges.push((Some(child_type), relation)),
                        None => {
                            ok = false;
                            break;
                        }
                    }
                }
                let ok = ok && child_constraint_violations(profile, node_type, &edges).is_empty();
                self.memo.insert((node, node_type), ok);
            }
        }
    }

    fn active_children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .children(node)
            .iter()
            .copied()
            .filter(|c| self.tree.get(*c).map_or(false, |n| !n.ignored))
            .collect()
    }

    /// Candidates accepting the node's file kind that may sit below `parent_type`
    fn candidates(&self, node: NodeId, parent_type: Option<NodeTypeId>) -> Vec<(NodeTypeId, Option<RelationId>)> {
        let Some(content) = self.tree.get(node) else {
            return Vec::new();
        };
        self.profile
            .types_for_kind(content.file_kind())
            .filter_map(|c| placement(self.profile, c, parent_type).map(|p| (c, p.relation)))
            .collect()
    }

    /// First candidate whose whole subtree can be typed
    fn choose(&self, node: NodeId, parent_type: Option<NodeTypeId>) -> Option<(NodeTypeId, Option<RelationId>)> {
        self.candidates(node, parent_type)
            .into_iter()
            .find(|(candidate, _)| self.memo.get(&(node, *candidate)).copied().unwrap_or(false))
    }

    /// Placements for `start` typed as `node_type` and its chosen subtree, pre-order
    fn collect(&self, start: NodeId, node_type: NodeTypeId, relation: Option<RelationId>) -> Vec<Placement> {
        let mut out = Vec::new();
        let mut stack = vec![(start, node_type, relation)];
        while let Some((node, node_type, relation)) = stack.pop() {
            out.push(Placement {
                node,
                node_type,
                relation,
            });
            let chosen: Vec<_> = self
                .active_children(node)
                .into_iter()
                .filter_map(|c| self.choose(c, Some(node_type)).map(|(t, r)| (c, t, r)))
                .collect();
            stack.extend(chosen.into_iter().rev());
        }
        out
    }

    /// Type what can be typed: viable subtrees completely, otherwise the first
    /// placeable candidate, descending until nothing fits
    fn best_effort(&self, start: NodeId, parent_type: Option<NodeTypeId>) -> (Vec<Placement>, Vec<NodeId>) {
        let mut placements = Vec::new();
        let mut untyped = Vec::new();
        let mut stack = vec![(start, parent_type)];
        while let Some((node, parent_type)) = stack.pop() {
            if let Some((node_type, relation)) = self.choose(node, parent_type) {
                placements.extend(self.collect(node, node_type, relation));
                continue;
            }
            match self.candidates(node, parent_type).first().copied() {
                Some((node_type, relation)) => {
                    placements.push(Placement {
                        node,
                        node_type,
                        relation,
                    });
                    let children = self.active_children(node);
                    stack.extend(children.into_iter().rev().map(|c| (c, Some(node_type))));
                }
                None => untyped.extend(active_subtree(self.tree, node)),
            }
        }
        (placements, untyped)
    }

    /// Follow the first placeable candidate down to the node where the search ran dry
    fn diagnose(&self, start: NodeId, parent_type: Option<NodeTypeId>) -> (NodeId, String) {
        let (mut node, mut parent_type) = (start, parent_type);
        loop {
            let kind = self.tree.get(node).and_then(|n| n.file_kind());
            let Some((first, _)) = self.candidates(node, parent_type).first().copied() else {
                let reason = match parent_type {
                    None => format!("no {} type may be a root", kind_label(kind)),
                    Some(parent) => format!(
                        "no {} type may be placed below {}",
                        kind_label(kind),
                        self.type_label(parent)
                    ),
                };
                return (node, reason);
            };

            let stuck = self
                .active_children(node)
                .into_iter()
                .find(|c| self.choose(*c, Some(first)).is_none());
            match stuck {
                Some(child) => {
                    node = child;
                    parent_type = Some(first);
                }
                None => {
                    let reason = format!(
                        "children do not satisfy the child constraints of {}",
                        self.type_label(first)
                    );
                    return (node, reason);
                }
            }
        }
    }

    fn type_label(&self, id: NodeTypeId) -> String {
        self.profile
            .get_node_type(id)
            .map_or_else(|| id.to_string(), |t| t.label.clone())
    }
}

fn kind_label(kind: Option<FileKind>) -> &'static str {
    match kind {
        Some(FileKind::Directory) => "directory",
        Some(FileKind::RegularFile) => "regular file",
        None => "virtual",
    }
}

impl<S: ObjectStore> ProfileEngine<S> {
    /// Assign node types to the whole tree
    pub fn assign_tree(&mut self, tree: &mut ContentTree) -> Result<AssignmentReport> {
        let root = tree
            .root()
            .ok_or_else(|| IpmError::InvalidTreeEdit("tree has no root".to_string()))?;
        self.assign_node_types(tree, root)
    }

    /// Assign node types to `start` and its subtree
    ///
    /// Existing types inside the subtree are re-derived, so running this twice
    /// gives the same result. When `start` has a parent, the parent must
    /// already be typed. Ignored nodes are left alone.
    ///
    /// On failure the error names the node where the search ran dry. With
    /// `rollback_on_failure` the tree is left exactly as it was; otherwise
    /// every node that could be typed keeps its type and the rest are left
    /// untyped.
    pub fn assign_node_types(&mut self, tree: &mut ContentTree, start: NodeId) -> Result<AssignmentReport> {
        self.check_binding(tree)?;
        let start_node = tree.node(start)?;
        if is_excluded(tree, start) {
            debug!(node = %start_node.identifier, "Skipping ignored subtree");
            return Ok(AssignmentReport::default());
        }

        let parent_type = match start_node.parent() {
            None => None,
            Some(parent) => match tree.node(parent)?.node_type {
                Some(t) => {
                    self.node_type_definition(t)?;
                    Some(t)
                }
                None => {
                    return Err(IpmError::NoEligibleType {
                        node: start_node.identifier.clone(),
                        reason: "parent is untyped".to_string(),
                    })
                }
            },
        };

        let plan = Planner::new(&self.profile, tree).plan(start, parent_type);
        match plan {
            Plan::Complete(placements) => {
                self.write_placements(tree, &placements, &[])?;
                let objects = placements
                    .iter()
                    .filter(|p| tree.get(p.node).map_or(false, |n| n.domain_object.is_some()))
                    .count();
                info!(
                    profile = %self.profile.identifier(),
                    typed = placements.len(),
                    objects,
                    "Assigned node types"
                );
                Ok(AssignmentReport { placements, objects })
            }
            Plan::Blocked {
                placements,
                untyped,
                blocked,
                reason,
            } => {
                let blocked_id = tree.node(blocked)?.identifier.clone();
                if self.config.rollback_on_failure {
                    warn!(node = %blocked_id, %reason, "Assignment failed, tree left unchanged");
                } else {
                    self.write_placements(tree, &placements, &untyped)?;
                    warn!(
                        node = %blocked_id,
                        %reason,
                        typed = placements.len(),
                        untyped = untyped.len(),
                        "Assignment failed, keeping partial typing"
                    );
                }
                Err(IpmError::NoEligibleType {
                    node: blocked_id,
                    reason,
                })
            }
        }
    }

    fn write_placements(&mut self, tree: &mut ContentTree, placements: &[Placement], untyped: &[NodeId]) -> Result<()> {
        for p in placements {
            let node = tree.node_mut(p.node)?;
            node.node_type = Some(p.node_type);
            node.parent_relation = p.relation;
        }
        for id in untyped {
            let node = tree.node_mut(*id)?;
            node.node_type = None;
            node.parent_relation = None;
        }
        for p in placements {
            self.sync_domain_object(tree, p.node)?;
        }
        if !placements.is_empty() {
            tree.set_profile(self.profile.identifier());
        }
        Ok(())
    }
}
