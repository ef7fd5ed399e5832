/**
 * engine module
 *
 * ProfileEngine binds one domain profile to one object store and runs every
 * profile-driven operation against a content tree:
 *
 * - assignment: top-down type assignment with per-node subtree search
 * - validation: whole-tree and local constraint checks
 * - transforms: legal transform discovery and application
 * - constraints: stateless constraint evaluation shared by all of the above
 */

pub mod assignment;
pub mod constraints;
pub mod transforms;
pub mod validation;

pub use assignment::{AssignmentReport, Placement};
pub use constraints::PropertyViolation;
pub use validation::{ValidationReport, Violation, ViolationKind};

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AssignmentConfig, EngineConfig};
use crate::errors::{IpmError, Result};
use crate::profile::{DomainProfile, NodeTypeId, ProfileCatalog};
use crate::storage::ObjectStore;
use crate::tree::{ContentTree, NodeId};

/// Profile-driven operations over content trees
///
/// The engine never owns a tree. Every operation borrows the tree it works on,
/// so one engine can serve any number of trees typed with its profile.
pub struct ProfileEngine<S: ObjectStore> {
    profile: Arc<DomainProfile>,
    store: S,
    config: AssignmentConfig,
}

impl<S: ObjectStore> ProfileEngine<S> {
    pub fn new(profile: Arc<DomainProfile>, store: S) -> Self {
        Self::with_config(profile, store, AssignmentConfig::default())
    }

    pub fn with_config(profile: Arc<DomainProfile>, store: S, config: AssignmentConfig) -> Self {
        info!(
            profile = %profile.identifier(),
            rollback_on_failure = config.rollback_on_failure,
            "Profile engine ready"
        );
        Self {
            profile,
            store,
            config,
        }
    }

    /// Resolve the configured profile in `catalog` and build an engine for it
    pub fn from_config(catalog: &ProfileCatalog, config: &EngineConfig, store: S) -> Result<Self> {
        let profile = catalog.resolve(&config.spec.profile)?;
        Ok(Self::with_config(profile, store, config.spec.assignment.clone()))
    }

    pub fn profile(&self) -> &DomainProfile {
        &self.profile
    }

    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Types that could be given to `node` right now
    ///
    /// A type qualifies when it accepts the node's file kind, may sit below
    /// the node's current parent, and every typed child would still satisfy
    /// one of its own parent constraints. Declaration order is kept.
    pub fn eligible_types(&self, tree: &ContentTree, node: NodeId) -> Result<Vec<NodeTypeId>> {
        self.check_binding(tree)?;
        let content = tree.node(node)?;
        let parent_type = match content.parent() {
            None => None,
            Some(parent) => match tree.node(parent)?.node_type {
                Some(t) => Some(t),
                None => return Ok(Vec::new()),
            },
        };

        let children: Vec<_> = tree
            .children(node)
            .iter()
            .filter_map(|c| tree.get(*c))
            .filter(|c| !c.ignored)
            .filter_map(|c| Some((c.node_type?, c.parent_relation)))
            .collect();

        let profile = &self.profile;
        Ok(profile
            .types_for_kind(content.file_kind())
            .filter(|candidate| constraints::placement(profile, *candidate, parent_type).is_some())
            .filter(|candidate| {
                children.iter().all(|(child_type, relation)| {
                    profile.get_node_type(*child_type).map_or(false, |t| {
                        t.parent_constraints
                            .iter()
                            .any(|c| constraints::evaluate(c, Some((Some(*candidate), *relation))))
                    })
                })
            })
            .collect())
    }

    /// Manually override the primary type of `node`
    ///
    /// Only the file association is enforced. The recorded parent relation is
    /// updated when the new type declares a placement below the current
    /// parent; neighbours are not re-checked.
    pub fn set_node_type(&mut self, tree: &mut ContentTree, node: NodeId, node_type: NodeTypeId) -> Result<()> {
        self.check_binding(tree)?;
        let definition = self.node_type_definition(node_type)?;
        let content = tree.node(node)?;
        if !definition.file_association.accepts(content.file_kind()) {
            return Err(IpmError::ConstraintViolation {
                node: content.identifier.clone(),
                detail: format!(
                    "{} requires a {} node",
                    definition.label, definition.file_association
                ),
            });
        }

        let parent_type = content.parent().and_then(|p| tree.get(p)).and_then(|p| p.node_type);
        let relation = if content.parent().is_none() {
            Some(None)
        } else {
            parent_type
                .and_then(|pt| constraints::placement(&self.profile, node_type, Some(pt)))
                .map(|c| c.relation)
        };

        let content = tree.node_mut(node)?;
        content.node_type = Some(node_type);
        if let Some(relation) = relation {
            content.parent_relation = relation;
        }
        debug!(node = %content.identifier, node_type = %definition.label, "Node type set manually");

        self.sync_domain_object(tree, node)?;
        tree.set_profile(self.profile.identifier());
        Ok(())
    }

    /// Attach a secondary type; its domain types are added to the object
    pub fn add_sub_type(&mut self, tree: &mut ContentTree, node: NodeId, sub_type: NodeTypeId) -> Result<()> {
        self.check_binding(tree)?;
        let definition = self.node_type_definition(sub_type)?;
        let content = tree.node(node)?;
        if !definition.file_association.accepts(content.file_kind()) {
            return Err(IpmError::ConstraintViolation {
                node: content.identifier.clone(),
                detail: format!(
                    "sub-type {} requires a {} node",
                    definition.label, definition.file_association
                ),
            });
        }
        if content.node_type == Some(sub_type) || content.sub_node_types.contains(&sub_type) {
            return Ok(());
        }

        tree.node_mut(node)?.sub_node_types.push(sub_type);
        self.sync_domain_object(tree, node)?;
        Ok(())
    }

    pub fn remove_sub_type(&mut self, tree: &mut ContentTree, node: NodeId, sub_type: NodeTypeId) -> Result<()> {
        self.check_binding(tree)?;
        let content = tree.node_mut(node)?;
        let before = content.sub_node_types.len();
        content.sub_node_types.retain(|t| *t != sub_type);
        if content.sub_node_types.len() != before {
            self.sync_domain_object(tree, node)?;
        }
        Ok(())
    }

    /// Property constraints of `candidate` that the node's domain object misses
    pub fn validate_properties(
        &self,
        tree: &ContentTree,
        node: NodeId,
        candidate: NodeTypeId,
    ) -> Result<Vec<PropertyViolation>> {
        self.check_binding(tree)?;
        self.node_type_definition(candidate)?;
        constraints::property_violations(&self.profile, &self.store, tree, node, candidate)
    }

    /// A tree typed by another profile must be cleared before this engine touches it
    fn check_binding(&self, tree: &ContentTree) -> Result<()> {
        match tree.profile() {
            Some(bound) if bound != self.profile.identifier() => Err(IpmError::ProfileMismatch {
                tree_profile: bound.to_string(),
                engine_profile: self.profile.identifier().to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn node_type_definition(&self, id: NodeTypeId) -> Result<&crate::profile::NodeType> {
        self.profile
            .get_node_type(id)
            .ok_or_else(|| IpmError::UnknownNodeType(format!("{} in {}", id, self.profile.identifier())))
    }

    /// Bring the node's domain object in line with its current types
    ///
    /// An existing object keeps its URI and gets its RDF types replaced. A new
    /// object is only created when the types carry domain types.
    fn sync_domain_object(&mut self, tree: &mut ContentTree, node: NodeId) -> Result<()> {
        let content = tree.node(node)?;
        let Some(primary) = content.node_type.filter(|t| self.profile.get_node_type(*t).is_some()) else {
            return Ok(());
        };
        let secondary: Vec<NodeTypeId> = content
            .sub_node_types
            .iter()
            .copied()
            .filter(|t| self.profile.get_node_type(*t).is_some())
            .collect();
        let domain_types = self.profile.domain_types_for(primary, &secondary);

        let object = match &content.domain_object {
            Some(object) => object.clone(),
            None if domain_types.is_empty() => return Ok(()),
            None => self.store.create_or_reuse_object(content)?,
        };
        self.store.set_type(&object, &domain_types)?;
        tree.node_mut(node)?.domain_object = Some(object);
        Ok(())
    }
}

/// `start` and everything below it, pre-order, skipping ignored subtrees
pub(crate) fn active_subtree(tree: &ContentTree, start: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        match tree.get(current) {
            Some(node) if !node.ignored => {
                out.push(current);
                stack.extend(node.children().iter().rev().copied());
            }
            _ => {}
        }
    }
    out
}

/// Is `node` or any of its ancestors ignored?
pub(crate) fn is_excluded(tree: &ContentTree, node: NodeId) -> bool {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .any(|id| tree.get(id).map_or(false, |n| n.ignored))
}
