//! Integration tests for the built-in PCDM profile
//!
//! End-to-end scenarios over hand-built trees:
//! - Type assignment for single and nested directories
//! - Directory plus file layouts that force the Object type
//! - Transform reversibility and transform preconditions
//! - Domain-object bookkeeping in the object store

use ipm_core::profile::pcdm;
use ipm_core::{
    ContentNode, ContentTree, InMemoryObjectStore, NodeId, ObjectStore, ProfileCatalog,
    ProfileEngine, RdfObjectStore,
};

// ==================== Test Helper Functions ====================

fn pcdm_engine() -> ProfileEngine<InMemoryObjectStore> {
    let catalog = ProfileCatalog::builtin().unwrap();
    let profile = catalog.resolve(pcdm::PROFILE_ID).unwrap();
    ProfileEngine::new(profile, InMemoryObjectStore::new())
}

fn type_label<S: ObjectStore>(engine: &ProfileEngine<S>, tree: &ContentTree, node: NodeId) -> String {
    let id = tree.node(node).unwrap().node_type.expect("node should be typed");
    engine.profile().node_type(id).label.clone()
}

fn transform_labels<S: ObjectStore>(engine: &ProfileEngine<S>, tree: &ContentTree, node: NodeId) -> Vec<String> {
    engine
        .legal_transforms(tree, node)
        .unwrap()
        .into_iter()
        .map(|t| engine.profile().transform(t).label.clone())
        .collect()
}

// ==================== Scenarios ====================

/// Test: A lone directory becomes an AdministrativeSet
#[test]
fn test_single_directory_is_administrative_set() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("archive"));

    engine.assign_tree(&mut tree).unwrap();

    assert_eq!(type_label(&engine, &tree, root), "AdministrativeSet");
    assert!(engine.validate_tree(&tree, root));
}

/// Test: Nested directories become AdministrativeSet over Collection
#[test]
fn test_nested_directories() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("archive"));
    let child = tree.add_child(root, ContentNode::directory("letters")).unwrap();

    engine.assign_tree(&mut tree).unwrap();

    assert_eq!(type_label(&engine, &tree, root), "AdministrativeSet");
    assert_eq!(type_label(&engine, &tree, child), "Collection");
    let member_of = engine
        .profile()
        .find_relation(&format!("{}memberOf", pcdm::PCDM_NS));
    assert_eq!(tree.node(child).unwrap().parent_relation, member_of);
    assert!(engine.validate_tree(&tree, root));
}

/// Test: AdministrativeSet -> Collection -> AdministrativeSet keeps the tree valid
#[test]
fn test_administrative_set_round_trip() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("archive"));
    engine.assign_tree(&mut tree).unwrap();
    let object_uri = tree.node(root).unwrap().domain_object.clone().unwrap();

    engine
        .apply_transform_by_label(&mut tree, root, pcdm::ADMINISTRATIVE_SET_TO_COLLECTION)
        .unwrap();
    assert_eq!(type_label(&engine, &tree, root), "Collection");
    assert!(engine.validate_tree(&tree, root));
    assert_eq!(
        engine.store().object_types(&object_uri).unwrap(),
        vec![format!("{}Collection", pcdm::PCDM_NS)]
    );

    engine
        .apply_transform_by_label(&mut tree, root, pcdm::COLLECTION_TO_ADMINISTRATIVE_SET)
        .unwrap();
    assert_eq!(type_label(&engine, &tree, root), "AdministrativeSet");
    assert!(engine.validate_tree(&tree, root));
    assert_eq!(tree.node(root).unwrap().domain_object.as_deref(), Some(object_uri.as_str()));
    assert_eq!(
        engine.store().object_types(&object_uri).unwrap(),
        vec![format!("{}AdministrativeSet", pcdm::PCDM_NS)]
    );
}

/// Test: object_to_collection is blocked by a File child and freed by removing it
#[test]
fn test_object_with_file_cannot_become_collection() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("diary"));
    let file = tree.add_child(root, ContentNode::regular_file("page-001.tif", 2048)).unwrap();
    engine.assign_tree(&mut tree).unwrap();
    assert_eq!(type_label(&engine, &tree, root), "Object");

    assert!(!transform_labels(&engine, &tree, root).contains(&pcdm::OBJECT_TO_COLLECTION.to_string()));
    assert!(engine
        .apply_transform_by_label(&mut tree, root, pcdm::OBJECT_TO_COLLECTION)
        .is_err());

    tree.remove_subtree(file).unwrap();
    assert_eq!(
        transform_labels(&engine, &tree, root),
        vec![pcdm::OBJECT_TO_COLLECTION.to_string()]
    );
    engine
        .apply_transform_by_label(&mut tree, root, pcdm::OBJECT_TO_COLLECTION)
        .unwrap();
    assert_eq!(type_label(&engine, &tree, root), "Collection");
}

/// Test: A directory holding a file becomes an Object with a File child
#[test]
fn test_directory_with_file_is_object() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("diary"));
    let file = tree.add_child(root, ContentNode::regular_file("page-001.tif", 2048)).unwrap();

    engine.assign_tree(&mut tree).unwrap();

    assert_eq!(type_label(&engine, &tree, root), "Object");
    assert_eq!(type_label(&engine, &tree, file), "File");
    let file_of = engine.profile().find_relation(&format!("{}fileOf", pcdm::PCDM_NS));
    assert_eq!(tree.node(file).unwrap().parent_relation, file_of);
    assert!(engine.validate_tree(&tree, root));
}

// ==================== Larger layouts ====================

/// Test: A realistic archive layout types every level
///
/// archive/
///   correspondence/
///     1921/
///       letter-01/ {scan.tif, transcript.txt}
///   photographs/
///     album/ {p1.jpg}
#[test]
fn test_archive_layout() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("archive"));
    let corr = tree.add_child(root, ContentNode::directory("correspondence")).unwrap();
    let year = tree.add_child(corr, ContentNode::directory("1921")).unwrap();
    let letter = tree.add_child(year, ContentNode::directory("letter-01")).unwrap();
    tree.add_child(letter, ContentNode::regular_file("scan.tif", 10)).unwrap();
    tree.add_child(letter, ContentNode::regular_file("transcript.txt", 3)).unwrap();
    let photos = tree.add_child(root, ContentNode::directory("photographs")).unwrap();
    let album = tree.add_child(photos, ContentNode::directory("album")).unwrap();
    tree.add_child(album, ContentNode::regular_file("p1.jpg", 7)).unwrap();

    let report = engine.assign_tree(&mut tree).unwrap();
    assert_eq!(report.typed(), tree.len());
    assert_eq!(report.objects, tree.len());

    assert_eq!(type_label(&engine, &tree, root), "AdministrativeSet");
    assert_eq!(type_label(&engine, &tree, corr), "Collection");
    assert_eq!(type_label(&engine, &tree, year), "Collection");
    assert_eq!(type_label(&engine, &tree, letter), "Object");
    assert_eq!(type_label(&engine, &tree, photos), "Collection");
    assert_eq!(type_label(&engine, &tree, album), "Object");
    assert!(engine.validate_tree(&tree, root));
}

/// Test: Every typed node's object carries its type's PCDM class
#[test]
fn test_domain_objects_follow_types() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("diary"));
    tree.add_child(root, ContentNode::regular_file("page.tif", 1)).unwrap();
    engine.assign_tree(&mut tree).unwrap();

    for (_, node) in tree.iter() {
        let uri = node.domain_object.as_deref().unwrap();
        let node_type = engine.profile().node_type(node.node_type.unwrap());
        assert_eq!(engine.store().object_types(uri).unwrap(), node_type.domain_types);
        assert_eq!(engine.store().record(uri).unwrap().node, node.identifier);
    }
}

/// Test: Property checks use the counts held by the store
#[test]
fn test_title_property_constraint() {
    let mut engine = pcdm_engine();
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("diary"));
    engine.assign_tree(&mut tree).unwrap();
    let object = engine.profile().find_node_type_by_label("Object").unwrap();
    let uri = tree.node(root).unwrap().domain_object.clone().unwrap();

    let missing = engine.validate_properties(&tree, root, object).unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].property, format!("{}title", pcdm::DCTERMS_NS));

    engine
        .store_mut()
        .add_property_value(&uri, &format!("{}title", pcdm::DCTERMS_NS), "Diary of A. Smith")
        .unwrap();
    assert!(engine.validate_properties(&tree, root, object).unwrap().is_empty());
}

/// Test: The RDF store records the same types as the in-memory store
#[test]
fn test_rdf_store_backs_engine() {
    let profile = ProfileCatalog::builtin().unwrap().resolve("PCDM").unwrap();
    let mut engine = ProfileEngine::new(profile, RdfObjectStore::new().unwrap());
    let (mut tree, root) = ContentTree::with_root(ContentNode::directory("diary"));
    let file = tree.add_child(root, ContentNode::regular_file("page.tif", 1)).unwrap();

    engine.assign_tree(&mut tree).unwrap();

    let objects = engine
        .store()
        .objects_of_type(&format!("{}Object", pcdm::PCDM_NS))
        .unwrap();
    assert_eq!(objects, vec![tree.node(root).unwrap().domain_object.clone().unwrap()]);
    let files = engine
        .store()
        .objects_of_type(&format!("{}File", pcdm::PCDM_NS))
        .unwrap();
    assert_eq!(files, vec![tree.node(file).unwrap().domain_object.clone().unwrap()]);
}
