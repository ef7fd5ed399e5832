// storage/memory.rs - In-memory object store
//
// Keeps objects in ordered maps so dumps and test assertions are stable.

use std::collections::BTreeMap;
use tracing::debug;

use super::{mint_object_uri, ObjectStore};
use crate::errors::{IpmError, Result};
use crate::tree::ContentNode;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRecord {
    /// Identifier of the content node the object was created for
    pub node: String,
    pub types: Vec<String>,
    pub properties: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<String, ObjectRecord>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, object: &str) -> bool {
        self.objects.contains_key(object)
    }

    pub fn record(&self, object: &str) -> Option<&ObjectRecord> {
        self.objects.get(object)
    }

    pub fn add_property_value(&mut self, object: &str, property: &str, value: &str) -> Result<()> {
        let record = self
            .objects
            .get_mut(object)
            .ok_or_else(|| IpmError::Store(format!("unknown object: {}", object)))?;
        record
            .properties
            .entry(property.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    pub fn property_values(&self, object: &str, property: &str) -> Vec<String> {
        self.objects
            .get(object)
            .and_then(|r| r.properties.get(property))
            .cloned()
            .unwrap_or_default()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn create_or_reuse_object(&mut self, node: &ContentNode) -> Result<String> {
        let uri = node.domain_object.clone().unwrap_or_else(mint_object_uri);
        if !self.objects.contains_key(&uri) {
            debug!(object = %uri, node = %node.identifier, "Registering domain object");
            self.objects.insert(
                uri.clone(),
                ObjectRecord {
                    node: node.identifier.clone(),
                    ..ObjectRecord::default()
                },
            );
        }
        Ok(uri)
    }

    fn property_count(&self, object: &str, property: &str) -> Result<usize> {
        Ok(self
            .objects
            .get(object)
            .and_then(|r| r.properties.get(property))
            .map_or(0, Vec::len))
    }

    fn set_type(&mut self, object: &str, domain_types: &[String]) -> Result<()> {
        let record = self
            .objects
            .get_mut(object)
            .ok_or_else(|| IpmError::Store(format!("unknown object: {}", object)))?;
        record.types = domain_types.to_vec();
        Ok(())
    }

    fn object_types(&self, object: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .get(object)
            .map(|r| r.types.clone())
            .unwrap_or_default())
    }
}
