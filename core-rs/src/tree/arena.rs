// tree/arena.rs - Arena-backed content tree
//
// Nodes live in a vector and refer to each other by index. Removed slots are
// left empty so outstanding `NodeId`s never alias a different node.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::node::{mint_identifier, ContentNode, NodeId};
use crate::errors::{IpmError, Result};

/// Arena of content nodes
///
/// Slots of removed nodes are never reused, so the arena only shrinks when a
/// tree is rebuilt (for example by scanning again). Node identifiers are
/// indexed; change a node's `identifier` only before it is added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TreeSlots")]
pub struct ContentTree {
    nodes: Vec<Option<ContentNode>>,
    root: Option<NodeId>,
    /// Identifier of the profile whose types the nodes carry
    profile: Option<String>,
    /// Identifier of every live node to its slot
    #[serde(skip)]
    index: HashMap<String, NodeId>,
}

/// Serialized form of `ContentTree`; the identifier index is rebuilt on load
#[derive(Deserialize)]
struct TreeSlots {
    nodes: Vec<Option<ContentNode>>,
    root: Option<NodeId>,
    #[serde(default)]
    profile: Option<String>,
}

impl From<TreeSlots> for ContentTree {
    fn from(slots: TreeSlots) -> Self {
        let index = slots
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (n.identifier.clone(), NodeId(i))))
            .collect();
        Self {
            nodes: slots.nodes,
            root: slots.root,
            profile: slots.profile,
            index,
        }
    }
}

impl ContentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree holding a single root node
    pub fn with_root(node: ContentNode) -> (Self, NodeId) {
        let mut tree = Self::new();
        let id = tree.insert(node, None);
        tree.root = Some(id);
        (tree, id)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub(crate) fn set_profile(&mut self, identifier: &str) {
        self.profile = Some(identifier.to_string());
    }

    /// Forget every type, relation and object reference and the profile binding
    pub fn clear_typing(&mut self) {
        self.profile = None;
        for node in self.nodes.iter_mut().flatten() {
            node.clear_typing();
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ContentNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn node(&self, id: NodeId) -> Result<&ContentNode> {
        self.get(id).ok_or_else(|| IpmError::UnknownNode(id.to_string()))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut ContentNode> {
        self.get_mut(id).ok_or_else(|| IpmError::UnknownNode(id.to_string()))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Live nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ContentNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// `id` followed by all of its descendants, depth-first pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Is `ancestor` equal to `id` or above it?
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Option<NodeId> {
        self.index
            .get(identifier)
            .copied()
            .filter(|id| self.get(*id).map_or(false, |n| n.identifier == identifier))
    }

    /// Resolve a `/`-separated path of node names below the root
    ///
    /// The empty path (or `"."`) is the root itself.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root?;
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|c| self.get(*c).map_or(false, |n| n.name == segment))?;
        }
        Some(current)
    }

    /// Path of names from the root down to `id`
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .iter()
            .rev()
            .skip(1)
            .filter_map(|a| self.get(*a).map(|n| n.name.as_str()))
            .collect();
        if self.parent(id).is_some() {
            if let Some(n) = self.get(id) {
                names.push(n.name.as_str());
            }
        }
        names.join("/")
    }

    /// Attach `node` as the last child of `parent`
    ///
    /// The node's `parent_relation` is kept as given.
    pub fn add_child(&mut self, parent: NodeId, node: ContentNode) -> Result<NodeId> {
        self.node(parent)?;
        if self.index.contains_key(&node.identifier) {
            return Err(IpmError::InvalidTreeEdit(format!(
                "identifier already in tree: {}",
                node.identifier
            )));
        }
        let id = self.insert(node, Some(parent));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Detach `id` and everything below it; returns the removed nodes in pre-order
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<ContentNode>> {
        self.node(id)?;
        if let Some(parent) = self.parent(id) {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        } else {
            self.root = None;
            self.profile = None;
        }

        let mut removed = Vec::new();
        for victim in self.descendants(id) {
            if let Some(mut node) = self.nodes[victim.0].take() {
                if self.index.get(&node.identifier) == Some(&victim) {
                    self.index.remove(&node.identifier);
                } else {
                    self.index.retain(|_, id| *id != victim);
                }
                node.parent = None;
                node.children.clear();
                removed.push(node);
            }
        }
        Ok(removed)
    }

    /// Re-parent `id` under `new_parent`, appending it to the new parent's children
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        let old_parent = self
            .node(id)?
            .parent
            .ok_or_else(|| IpmError::InvalidTreeEdit("the root cannot be moved".to_string()))?;
        self.node(new_parent)?;
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(IpmError::InvalidTreeEdit(format!(
                "{} cannot be moved below itself",
                id
            )));
        }

        self.node_mut(old_parent)?.children.retain(|c| *c != id);
        self.node_mut(new_parent)?.children.push(id);
        self.node_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    /// Deep-copy the subtree at `id` below `new_parent`
    ///
    /// Copies get fresh identifiers and no domain object; types and relations
    /// are carried over.
    pub fn copy_subtree(&mut self, id: NodeId, new_parent: NodeId) -> Result<NodeId> {
        self.node(id)?;
        self.node(new_parent)?;

        // snapshot first: copying below the source must not copy the copies
        let originals: HashSet<NodeId> = self.descendants(id).into_iter().collect();
        let mut pending = vec![(id, new_parent)];
        let mut copied_root = None;
        while let Some((source, target_parent)) = pending.pop() {
            let mut copy = self.node(source)?.clone();
            copy.identifier = mint_identifier();
            copy.domain_object = None;
            copy.children.clear();
            let source_children: Vec<NodeId> = self
                .children(source)
                .iter()
                .copied()
                .filter(|c| originals.contains(c))
                .collect();

            let copy_id = self.insert(copy, Some(target_parent));
            self.node_mut(target_parent)?.children.push(copy_id);
            copied_root.get_or_insert(copy_id);

            // reversed so the stack yields children in their original order
            pending.extend(source_children.into_iter().rev().map(|c| (c, copy_id)));
        }
        copied_root.ok_or_else(|| IpmError::UnknownNode(id.to_string()))
    }

    fn insert(&mut self, mut node: ContentNode, parent: Option<NodeId>) -> NodeId {
        node.parent = parent;
        node.children.clear();
        let id = NodeId(self.nodes.len());
        self.index.insert(node.identifier.clone(), id);
        self.nodes.push(Some(node));
        id
    }
}
