//! Engine Contract Tests
//!
//! These tests pin INVARIANTS of type assignment, validation and transforms
//! that callers rely on. Each one states what breaks if it ever fails.

use ipm_core::profile::pcdm;
use ipm_core::{
    ContentNode, ContentTree, InMemoryObjectStore, NodeId, ProfileCatalog, ProfileEngine,
};

fn engine() -> ProfileEngine<InMemoryObjectStore> {
    let profile = ProfileCatalog::builtin().unwrap().resolve(pcdm::PROFILE_ID).unwrap();
    ProfileEngine::new(profile, InMemoryObjectStore::new())
}

/// A mixed layout: nested collections, objects with files, an object inside
/// an object, and an empty directory
fn mixed_tree() -> (ContentTree, NodeId) {
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("archive"));
    let a = tree.add_child(root, ContentNode::directory("a")).unwrap();
    let a1 = tree.add_child(a, ContentNode::directory("a1")).unwrap();
    tree.add_child(a1, ContentNode::regular_file("x.tif", 1)).unwrap();
    let a2 = tree.add_child(a1, ContentNode::directory("a2")).unwrap();
    tree.add_child(a2, ContentNode::regular_file("y.tif", 1)).unwrap();
    tree.add_child(root, ContentNode::directory("empty")).unwrap();
    let b = tree.add_child(root, ContentNode::directory("b")).unwrap();
    tree.add_child(b, ContentNode::regular_file("z.txt", 1)).unwrap();
    (tree, root)
}

fn types_of(tree: &ContentTree) -> Vec<(String, Option<String>)> {
    tree.iter()
        .map(|(id, n)| (tree.path_of(id), n.node_type.map(|t| t.to_string())))
        .collect()
}

/// INVARIANT: Same tree + same profile = same types
/// BREAKS: Reproducible ingest; two operators scanning the same delivery
/// would get different packages
#[test]
fn assignment_is_deterministic() {
    let (mut first, _) = mixed_tree();
    let (mut second, _) = mixed_tree();

    engine().assign_tree(&mut first).unwrap();
    engine().assign_tree(&mut second).unwrap();

    assert_eq!(types_of(&first), types_of(&second));
}

/// INVARIANT: Assigning an already-typed tree changes nothing
/// BREAKS: Re-running assignment after an unrelated edit would reshuffle types
/// and mint duplicate domain objects
#[test]
fn assignment_is_idempotent() {
    let mut engine = engine();
    let (mut tree, _) = mixed_tree();

    engine.assign_tree(&mut tree).unwrap();
    let snapshot = tree.clone();
    let objects = engine.store().len();

    engine.assign_tree(&mut tree).unwrap();

    for (id, node) in snapshot.iter() {
        assert_eq!(tree.node(id).unwrap(), node, "node {} changed", snapshot.path_of(id));
    }
    assert_eq!(engine.store().len(), objects);
}

/// INVARIANT: A successfully assigned tree always validates
/// BREAKS: Assignment would hand out packages that fail their own checks
#[test]
fn successful_assignment_validates() {
    let mut engine = engine();
    let (mut tree, root) = mixed_tree();

    engine.assign_tree(&mut tree).unwrap();

    let report = engine.validation_report(&tree, root).unwrap();
    assert!(report.is_valid(), "{:?}", report.violations);
    assert_eq!(report.checked, tree.len());
}

/// INVARIANT: Every assigned subtree validates too
/// BREAKS: Local re-assignment after an edit would leave a broken subtree
#[test]
fn subtree_assignment_validates() {
    let mut engine = engine();
    let (mut tree, root) = mixed_tree();
    engine.assign_tree(&mut tree).unwrap();

    let a = tree.find_by_path("a").unwrap();
    let extra = tree.add_child(a, ContentNode::directory("new")).unwrap();
    tree.add_child(extra, ContentNode::regular_file("n.txt", 1)).unwrap();

    engine.assign_node_types(&mut tree, extra).unwrap();
    assert!(engine.validate_tree(&tree, root));
}

/// INVARIANT: Every assigned node's type accepts its file kind
/// BREAKS: Files typed as containers (or the reverse) reach the object store
#[test]
fn assigned_types_match_file_kind() {
    let mut engine = engine();
    let (mut tree, _) = mixed_tree();
    engine.assign_tree(&mut tree).unwrap();

    for (_, node) in tree.iter() {
        let t = engine.profile().node_type(node.node_type.unwrap());
        assert!(t.file_association.accepts(node.file_kind()), "{} as {}", node.name, t.label);
    }
}

/// INVARIANT: Every legal transform can be applied and leaves a valid tree
/// when the PCDM reverse transform exists, applying it restores the type
/// BREAKS: Users could offer transforms that corrupt the package, or get
/// stuck with no way back
#[test]
fn legal_transforms_keep_tree_valid_and_reverse() {
    let mut engine = engine();
    let (mut tree, root) = mixed_tree();
    engine.assign_tree(&mut tree).unwrap();

    let nodes: Vec<NodeId> = tree.iter().map(|(id, _)| id).collect();
    for node in nodes {
        for transform in engine.legal_transforms(&tree, node).unwrap() {
            let mut scratch = tree.clone();
            let before = scratch.node(node).unwrap().clone();
            let definition = engine.profile().transform(transform).clone();

            engine.apply_transform(&mut scratch, node, transform).unwrap();
            assert!(
                engine.validate_tree(&scratch, root),
                "{} broke the tree at {}",
                definition.label,
                scratch.path_of(node)
            );

            let after = scratch.node(node).unwrap();
            assert_eq!(after.node_type, Some(definition.result_node_type));
            assert_eq!(after.domain_object, before.domain_object);
            assert_eq!(after.parent_relation, before.parent_relation);
            assert_eq!(after.children(), before.children());

            let reverse = engine
                .profile()
                .transforms_from(definition.result_node_type)
                .find(|r| engine.profile().transform(*r).result_node_type == definition.source_node_type);
            if let Some(reverse) = reverse {
                if engine.legal_transforms(&scratch, node).unwrap().contains(&reverse) {
                    engine.apply_transform(&mut scratch, node, reverse).unwrap();
                    assert_eq!(scratch.node(node).unwrap().node_type, before.node_type);
                    assert!(engine.validate_tree(&scratch, root));
                }
            }
        }
    }
}

/// INVARIANT: Applying a transform never touches other nodes
/// BREAKS: Transforms would silently re-type neighbours
#[test]
fn transform_is_local() {
    let mut engine = engine();
    let (mut tree, _) = mixed_tree();
    engine.assign_tree(&mut tree).unwrap();

    let a = tree.find_by_path("a").unwrap();
    let transforms = engine.legal_transforms(&tree, a).unwrap();
    assert!(!transforms.is_empty());
    let before = tree.clone();

    engine.apply_transform(&mut tree, a, transforms[0]).unwrap();

    for (id, node) in before.iter().filter(|(id, _)| *id != a) {
        assert_eq!(tree.node(id).unwrap(), node);
    }
}

/// INVARIANT: An illegal transform leaves node and store untouched
/// BREAKS: Failed UI actions would leave half-applied types behind
#[test]
fn illegal_transform_has_no_effect() {
    let mut engine = engine();
    let (mut tree, _) = mixed_tree();
    engine.assign_tree(&mut tree).unwrap();

    let b = tree.find_by_path("b").unwrap();
    let uri = tree.node(b).unwrap().domain_object.clone().unwrap();
    let types_before = engine.store().record(&uri).unwrap().types.clone();
    let before = tree.clone();

    let result = engine.apply_transform_by_label(&mut tree, b, pcdm::OBJECT_TO_COLLECTION);
    assert!(result.is_err());
    assert_eq!(tree.node(b).unwrap(), before.node(b).unwrap());
    assert_eq!(engine.store().record(&uri).unwrap().types, types_before);
}
