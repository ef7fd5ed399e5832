//! Node transforms
//!
//! A transform re-types one node in place. It is legal when the node carries
//! the transform's source type and the node's current neighbourhood meets the
//! transform's preconditions. Applying it changes the primary type and the
//! domain object's RDF types; the object URI, properties, children and
//! recorded edge relations stay as they are.

use tracing::{info, warn};

use super::constraints::{matches_child, matches_parent};
use super::{is_excluded, ProfileEngine};
use crate::errors::{IpmError, Result};
use crate::profile::{DomainProfile, NodeTransform, TransformId};
use crate::storage::ObjectStore;
use crate::tree::{ContentTree, NodeId};

/// Are the preconditions of `transform` met by `node` as it stands?
///
/// Nodes inside an ignored subtree never qualify.
pub fn is_legal(transform: &NodeTransform, tree: &ContentTree, node: NodeId) -> bool {
    let Some(content) = tree.get(node) else {
        return false;
    };
    if content.node_type != Some(transform.source_node_type) || is_excluded(tree, node) {
        return false;
    }
    let parent_ok = transform
        .source_parent_constraint
        .as_ref()
        .map_or(true, |c| matches_parent(c, tree, node));
    parent_ok
        && transform
            .source_child_constraints
            .iter()
            .all(|c| matches_child(c, tree, node))
}

/// Transforms of `profile` legal for `node`, in declaration order
pub fn legal_transforms(profile: &DomainProfile, tree: &ContentTree, node: NodeId) -> Vec<TransformId> {
    let Some(source) = tree.get(node).and_then(|n| n.node_type) else {
        return Vec::new();
    };
    profile
        .transforms_from(source)
        .filter(|id| is_legal(profile.transform(*id), tree, node))
        .collect()
}

impl<S: ObjectStore> ProfileEngine<S> {
    /// Transforms currently legal for `node`; empty for untyped nodes
    pub fn legal_transforms(&self, tree: &ContentTree, node: NodeId) -> Result<Vec<TransformId>> {
        self.check_binding(tree)?;
        tree.node(node)?;
        Ok(legal_transforms(&self.profile, tree, node))
    }

    /// Apply `transform` to `node`
    ///
    /// Fails with `IllegalTransform` unless the transform is in
    /// `legal_transforms(node)` at the time of the call.
    pub fn apply_transform(&mut self, tree: &mut ContentTree, node: NodeId, transform: TransformId) -> Result<()> {
        self.check_binding(tree)?;
        let content = tree.node(node)?;
        let definition = self.profile.get_transform(transform).ok_or_else(|| IpmError::IllegalTransform {
            node: content.identifier.clone(),
            transform: transform.to_string(),
        })?;

        if !is_legal(definition, tree, node) {
            warn!(node = %content.identifier, transform = %definition.label, "Transform preconditions not met");
            return Err(IpmError::IllegalTransform {
                node: content.identifier.clone(),
                transform: definition.label.clone(),
            });
        }

        let result = definition.result_node_type;
        let label = definition.label.clone();
        tree.node_mut(node)?.node_type = Some(result);
        self.sync_domain_object(tree, node)?;

        info!(
            node = %tree.node(node)?.identifier,
            transform = %label,
            result = %self.profile.node_type(result).label,
            "Applied transform"
        );
        Ok(())
    }

    /// Look a transform up by label and apply it
    pub fn apply_transform_by_label(&mut self, tree: &mut ContentTree, node: NodeId, label: &str) -> Result<()> {
        let transform = self.profile.find_transform(label).ok_or_else(|| IpmError::IllegalTransform {
            node: tree.get(node).map_or_else(|| node.to_string(), |n| n.identifier.clone()),
            transform: label.to_string(),
        })?;
        self.apply_transform(tree, node, transform)
    }
}
