/**
 * rdf.rs
 * Domain object store backed by an Oxigraph RDF store
 */

use oxigraph::model::vocab::rdf;
use oxigraph::model::{GraphName, Literal, NamedNode, Quad, Term};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::collections::HashMap;
use tracing::debug;

use super::{mint_object_uri, ObjectStore};
use crate::errors::{IpmError, Result};
use crate::tree::ContentNode;

/// Links a domain object to the identifier of its content node
pub const CONTENT_NODE_PREDICATE: &str = "https://ipm.example.org/ns#contentNode";

pub struct RdfObjectStore {
    store: Store,
}

impl RdfObjectStore {
    /// Fresh in-memory Oxigraph store
    pub fn new() -> Result<Self> {
        let store = Store::new().map_err(|e| IpmError::Store(e.to_string()))?;
        Ok(Self { store })
    }

    /// Wrap an existing store, e.g. one opened on disk by the caller
    pub fn from_store(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn add_property_value(&mut self, object: &str, property: &str, value: &str) -> Result<()> {
        let quad = Quad::new(
            named(object)?,
            named(property)?,
            Literal::new_simple_literal(value),
            GraphName::DefaultGraph,
        );
        self.store
            .insert(&quad)
            .map_err(|e| IpmError::Store(e.to_string()))?;
        Ok(())
    }

    /// Objects currently typed with `domain_type`, sorted
    pub fn objects_of_type(&self, domain_type: &str) -> Result<Vec<String>> {
        let query = format!(
            r#"
            SELECT ?object
            WHERE {{
                ?object <{}> <{}> .
            }}
            "#,
            rdf::TYPE.as_str(),
            named(domain_type)?.as_str()
        );
        let mut objects: Vec<String> = self
            .query_sparql(&query)?
            .into_iter()
            .filter_map(|mut row| row.remove("object"))
            .collect();
        objects.sort();
        Ok(objects)
    }

    /// Execute a SPARQL SELECT; IRIs and literal values are returned as plain strings
    pub fn query_sparql(&self, query: &str) -> Result<Vec<HashMap<String, String>>> {
        let results = self
            .store
            .query(query)
            .map_err(|e| IpmError::Store(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| IpmError::Store(e.to_string()))?;
                    let mut row = HashMap::new();
                    for (var, term) in solution.iter() {
                        let value = match term {
                            Term::NamedNode(node) => node.as_str().to_string(),
                            Term::Literal(literal) => literal.value().to_string(),
                            other => other.to_string(),
                        };
                        row.insert(var.as_str().to_string(), value);
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            _ => Err(IpmError::Store("expected SELECT query results".to_string())),
        }
    }

    fn quads_about(&self, object: &NamedNode, predicate: &NamedNode) -> Result<Vec<Quad>> {
        self.store
            .quads_for_pattern(
                Some(object.as_ref().into()),
                Some(predicate.as_ref()),
                None,
                None,
            )
            .map(|q| q.map_err(|e| IpmError::Store(e.to_string())))
            .collect()
    }
}

impl ObjectStore for RdfObjectStore {
    fn create_or_reuse_object(&mut self, node: &ContentNode) -> Result<String> {
        let uri = node.domain_object.clone().unwrap_or_else(mint_object_uri);
        let marker = Quad::new(
            named(&uri)?,
            named(CONTENT_NODE_PREDICATE)?,
            Literal::new_simple_literal(node.identifier.as_str()),
            GraphName::DefaultGraph,
        );
        let inserted = self
            .store
            .insert(&marker)
            .map_err(|e| IpmError::Store(e.to_string()))?;
        if inserted {
            debug!(object = %uri, node = %node.identifier, "Registered domain object");
        }
        Ok(uri)
    }

    fn property_count(&self, object: &str, property: &str) -> Result<usize> {
        Ok(self.quads_about(&named(object)?, &named(property)?)?.len())
    }

    fn set_type(&mut self, object: &str, domain_types: &[String]) -> Result<()> {
        let subject = named(object)?;
        let type_predicate = rdf::TYPE.into_owned();
        for quad in self.quads_about(&subject, &type_predicate)? {
            self.store
                .remove(&quad)
                .map_err(|e| IpmError::Store(e.to_string()))?;
        }
        for domain_type in domain_types {
            let quad = Quad::new(
                subject.clone(),
                type_predicate.clone(),
                named(domain_type)?,
                GraphName::DefaultGraph,
            );
            self.store
                .insert(&quad)
                .map_err(|e| IpmError::Store(e.to_string()))?;
        }
        Ok(())
    }

    fn object_types(&self, object: &str) -> Result<Vec<String>> {
        let quads = self.quads_about(&named(object)?, &rdf::TYPE.into_owned())?;
        let mut types: Vec<String> = quads
            .into_iter()
            .filter_map(|q| match q.object {
                Term::NamedNode(n) => Some(n.into_string()),
                _ => None,
            })
            .collect();
        types.sort();
        Ok(types)
    }
}

fn named(iri: &str) -> Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| IpmError::Store(format!("invalid IRI '{}': {}", iri, e)))
}
