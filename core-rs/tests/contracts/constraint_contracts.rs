//! Constraint Contract Tests
//!
//! Pins the meaning of positive and negated node constraints. Profiles are
//! authored against these semantics; changing them silently re-interprets
//! every existing profile.

use ipm_core::engine::constraints::{evaluate, matches_child, matches_parent, Edge};
use ipm_core::profile::pcdm;
use ipm_core::{
    Cardinality, ContentNode, ContentTree, DomainProfile, NodeConstraint, NodeTypeId, RelationId,
};

struct Pcdm {
    profile: DomainProfile,
    collection: NodeTypeId,
    object: NodeTypeId,
    file: NodeTypeId,
    member_of: RelationId,
    file_of: RelationId,
}

fn pcdm() -> Pcdm {
    let profile = pcdm::profile().unwrap();
    Pcdm {
        collection: profile.find_node_type_by_label("Collection").unwrap(),
        object: profile.find_node_type_by_label("Object").unwrap(),
        file: profile.find_node_type_by_label("File").unwrap(),
        member_of: profile.find_relation(&format!("{}memberOf", pcdm::PCDM_NS)).unwrap(),
        file_of: profile.find_relation(&format!("{}fileOf", pcdm::PCDM_NS)).unwrap(),
        profile,
    }
}

fn negated(c: NodeConstraint) -> NodeConstraint {
    NodeConstraint {
        matches_none: !c.matches_none,
        ..c
    }
}

/// INVARIANT: A negated constraint holds exactly when its positive twin fails
/// BREAKS: disallow(...) preconditions on transforms would stop meaning "none"
#[test]
fn negation_is_exact_complement() {
    let p = pcdm();
    let constraints = [
        NodeConstraint::allow(p.object, p.member_of),
        NodeConstraint::allow(p.file, p.file_of),
        NodeConstraint::allow(p.collection, p.file_of),
        NodeConstraint {
            node_type: None,
            relation: Some(p.member_of),
            matches_none: false,
            cardinality: Cardinality::ANY,
        },
    ];
    let edge_sets: Vec<Vec<Edge>> = vec![
        vec![],
        vec![(Some(p.object), Some(p.member_of))],
        vec![(Some(p.file), Some(p.file_of))],
        vec![(Some(p.object), Some(p.member_of)), (Some(p.file), Some(p.file_of))],
        vec![(None, None)],
        vec![(Some(p.collection), Some(p.member_of)), (Some(p.collection), Some(p.member_of))],
    ];

    for c in constraints {
        for edges in &edge_sets {
            let positive = evaluate(&c, edges.iter().copied());
            let negative = evaluate(&negated(c), edges.iter().copied());
            assert_ne!(positive, negative, "{:?} on {:?}", c, edges);
        }
    }
}

/// INVARIANT: none() as a parent constraint means "is a root"
/// BREAKS: Root detection in assignment and the collection_to_administrativeSet
/// precondition
#[test]
fn none_parent_constraint_means_root() {
    let p = pcdm();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("r"));
    let child = tree.add_child(root, ContentNode::directory("c")).unwrap();
    let grandchild = tree.add_child(child, ContentNode::directory("g")).unwrap();

    assert!(matches_parent(&NodeConstraint::none(), &tree, root));
    assert!(!matches_parent(&NodeConstraint::none(), &tree, child));
    assert!(!matches_parent(&NodeConstraint::none(), &tree, grandchild));
    assert!(NodeConstraint::none().allows_no_parent());
    assert!(p.profile.node_type(p.object).may_be_root());
    assert!(!p.profile.node_type(p.file).may_be_root());
}

/// INVARIANT: A negated child constraint must hold for ALL children
/// BREAKS: object_to_collection would become legal while one File remains
#[test]
fn negated_child_constraint_covers_every_child() {
    let p = pcdm();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("obj"));
    tree.node_mut(root).unwrap().node_type = Some(p.object);

    let mut sub = ContentNode::directory("sub");
    sub.node_type = Some(p.object);
    sub.parent_relation = Some(p.member_of);
    tree.add_child(root, sub).unwrap();

    let no_files = NodeConstraint::disallow(p.file, p.file_of);
    assert!(matches_child(&no_files, &tree, root));

    let mut file = ContentNode::regular_file("f", 1);
    file.node_type = Some(p.file);
    file.parent_relation = Some(p.file_of);
    let file = tree.add_child(root, file).unwrap();
    assert!(!matches_child(&no_files, &tree, root));

    tree.remove_subtree(file).unwrap();
    assert!(matches_child(&no_files, &tree, root));
}

/// INVARIANT: Relation is part of the edge identity
/// BREAKS: A File attached via memberOf would pass as a proper File
#[test]
fn relation_mismatch_is_not_covered() {
    let p = pcdm();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("obj"));
    tree.node_mut(root).unwrap().node_type = Some(p.object);
    let mut file = ContentNode::regular_file("f", 1);
    file.node_type = Some(p.file);
    file.parent_relation = Some(p.member_of);
    let file = tree.add_child(root, file).unwrap();

    assert!(!matches_parent(&NodeConstraint::allow(p.object, p.file_of), &tree, file));
    assert!(matches_parent(&NodeConstraint::disallow(p.object, p.file_of), &tree, file));
}

/// INVARIANT: An untyped neighbour never satisfies a typed constraint
/// BREAKS: Half-typed trees would validate
#[test]
fn untyped_neighbour_is_not_covered() {
    let p = pcdm();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("raw"));
    let mut file = ContentNode::regular_file("f", 1);
    file.parent_relation = Some(p.file_of);
    let file = tree.add_child(root, file).unwrap();

    assert!(!matches_parent(&NodeConstraint::allow(p.object, p.file_of), &tree, file));
    assert!(!matches_child(&NodeConstraint::allow(p.file, p.file_of), &tree, root));
}
