//! Built-in Portland Common Data Model (PCDM) profile
//!
//! Directories become AdministrativeSet, Collection or Object nodes; regular
//! files become File nodes attached to an Object through `pcdm:fileOf`.

use super::domain::{DomainProfile, DomainProfileBuilder, ProfileError};
use super::types::{
    Cardinality, FileAssociation, NodeConstraint, NodeTransform, PropertyConstraint,
};

pub const PROFILE_ID: &str = "https://ipm.example.org/profile/pcdm";
pub const DOMAIN_ID: &str = "http://pcdm.org/models";

pub const PCDM_NS: &str = "http://pcdm.org/models#";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const TYPE_NS: &str = "https://ipm.example.org/profile/pcdm#";

pub const ADMINISTRATIVE_SET_TO_COLLECTION: &str = "administrativeSet_to_collection";
pub const COLLECTION_TO_ADMINISTRATIVE_SET: &str = "collection_to_administrativeSet";
pub const COLLECTION_TO_OBJECT: &str = "collection_to_object";
pub const OBJECT_TO_COLLECTION: &str = "object_to_collection";

/// Build the PCDM profile
///
/// Declaration order is significant: for a directory the engine tries
/// AdministrativeSet, then Collection, then Object.
pub fn profile() -> Result<DomainProfile, ProfileError> {
    let mut b = DomainProfileBuilder::new(PROFILE_ID, DOMAIN_ID, "PCDM");

    let member_of = b.relation(&pcdm("memberOf"), &pcdm("hasMember"))?;
    let file_of = b.relation(&pcdm("fileOf"), &pcdm("hasFile"))?;

    let title = b.property_type(&format!("{}title", DCTERMS_NS), "Title")?;
    let description = b.property_type(&format!("{}description", DCTERMS_NS), "Description")?;

    let admin_set = b.node_type(&local("AdministrativeSet"), "AdministrativeSet", FileAssociation::Directory)?;
    let collection = b.node_type(&local("Collection"), "Collection", FileAssociation::Directory)?;
    let object = b.node_type(&local("Object"), "Object", FileAssociation::Directory)?;
    let file = b.node_type(&local("File"), "File", FileAssociation::RegularFile)?;

    b.describe(admin_set, "Top-level grouping that governs the collections and objects below it")
        .domain_type(admin_set, &pcdm("AdministrativeSet"))
        .parent_constraint(admin_set, NodeConstraint::none())
        .child_constraint(admin_set, NodeConstraint::allow(collection, member_of))
        .child_constraint(admin_set, NodeConstraint::allow(object, member_of));

    b.describe(collection, "Group of objects and sub-collections")
        .domain_type(collection, &pcdm("Collection"))
        .parent_constraint(collection, NodeConstraint::none())
        .parent_constraint(collection, NodeConstraint::allow(admin_set, member_of))
        .parent_constraint(collection, NodeConstraint::allow(collection, member_of))
        .child_constraint(collection, NodeConstraint::allow(collection, member_of))
        .child_constraint(collection, NodeConstraint::allow(object, member_of));

    b.describe(object, "Intellectual entity carrying files and member objects")
        .domain_type(object, &pcdm("Object"))
        .parent_constraint(object, NodeConstraint::none())
        .parent_constraint(object, NodeConstraint::allow(admin_set, member_of))
        .parent_constraint(object, NodeConstraint::allow(collection, member_of))
        .parent_constraint(object, NodeConstraint::allow(object, member_of))
        .child_constraint(object, NodeConstraint::allow(object, member_of))
        .child_constraint(object, NodeConstraint::allow(file, file_of));

    b.describe(file, "Bitstream belonging to an object")
        .domain_type(file, &pcdm("File"))
        .parent_constraint(file, NodeConstraint::allow(object, file_of));

    for owner in [admin_set, collection, object] {
        b.property_constraint(owner, PropertyConstraint {
            property_type: title,
            cardinality: Cardinality::exactly(1),
        });
        b.property_constraint(owner, PropertyConstraint {
            property_type: description,
            cardinality: Cardinality::ANY,
        });
    }

    b.transform(NodeTransform {
        label: ADMINISTRATIVE_SET_TO_COLLECTION.to_string(),
        description: "Demote an administrative set to a collection".to_string(),
        source_node_type: admin_set,
        source_parent_constraint: None,
        source_child_constraints: Vec::new(),
        result_node_type: collection,
    })?;

    b.transform(NodeTransform {
        label: COLLECTION_TO_ADMINISTRATIVE_SET.to_string(),
        description: "Promote a top-level collection to an administrative set".to_string(),
        source_node_type: collection,
        source_parent_constraint: Some(NodeConstraint::none()),
        source_child_constraints: Vec::new(),
        result_node_type: admin_set,
    })?;

    b.transform(NodeTransform {
        label: COLLECTION_TO_OBJECT.to_string(),
        description: "Turn a collection without sub-collections into an object".to_string(),
        source_node_type: collection,
        source_parent_constraint: None,
        source_child_constraints: vec![NodeConstraint::disallow(collection, member_of)],
        result_node_type: object,
    })?;

    b.transform(NodeTransform {
        label: OBJECT_TO_COLLECTION.to_string(),
        description: "Turn an object without files into a collection".to_string(),
        source_node_type: object,
        source_parent_constraint: Some(NodeConstraint::disallow(object, member_of)),
        source_child_constraints: vec![NodeConstraint::disallow(file, file_of)],
        result_node_type: collection,
    })?;

    b.build()
}

fn pcdm(term: &str) -> String {
    format!("{}{}", PCDM_NS, term)
}

fn local(term: &str) -> String {
    format!("{}{}", TYPE_NS, term)
}
