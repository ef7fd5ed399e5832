// storage/mod.rs - Domain object stores
//
// The engine never stores triples itself. It talks to an `ObjectStore`, which
// owns the domain objects that content nodes point at.

pub mod memory;
pub mod rdf;

pub use memory::InMemoryObjectStore;
pub use rdf::RdfObjectStore;

use crate::errors::Result;
use crate::tree::ContentNode;

/// Blocking request/response interface to the domain-object store
///
/// Each call is atomic on its own; nothing spans several nodes.
pub trait ObjectStore {
    /// Return the node's existing object URI, or mint and register a new one
    fn create_or_reuse_object(&mut self, node: &ContentNode) -> Result<String>;

    /// Number of values stored for `property` on `object`; unknown objects count zero
    fn property_count(&self, object: &str, property: &str) -> Result<usize>;

    /// Replace the recorded RDF types of `object`
    fn set_type(&mut self, object: &str, domain_types: &[String]) -> Result<()>;

    /// Currently recorded RDF types of `object`
    fn object_types(&self, object: &str) -> Result<Vec<String>>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &mut S {
    fn create_or_reuse_object(&mut self, node: &ContentNode) -> Result<String> {
        (**self).create_or_reuse_object(node)
    }

    fn property_count(&self, object: &str, property: &str) -> Result<usize> {
        (**self).property_count(object, property)
    }

    fn set_type(&mut self, object: &str, domain_types: &[String]) -> Result<()> {
        (**self).set_type(object, domain_types)
    }

    fn object_types(&self, object: &str) -> Result<Vec<String>> {
        (**self).object_types(object)
    }
}

pub(crate) fn mint_object_uri() -> String {
    format!("urn:uuid:{}", uuid::Uuid::new_v4())
}
