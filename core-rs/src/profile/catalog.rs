//! Immutable catalog of domain profiles
//!
//! Built once at startup and handed to whoever needs a profile. There is no
//! global registry: callers pass the catalog (or a single `Arc<DomainProfile>`)
//! explicitly.

use std::sync::Arc;
use tracing::info;

use super::domain::DomainProfile;
use super::pcdm;
use crate::errors::{IpmError, Result};

#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: Vec<Arc<DomainProfile>>,
}

impl ProfileCatalog {
    /// Catalog from already-built profiles; identifiers must be unique
    pub fn new(profiles: Vec<DomainProfile>) -> Result<Self> {
        let mut catalog = Self::default();
        for profile in profiles {
            if catalog.get(profile.identifier()).is_some() {
                return Err(IpmError::Profile(format!(
                    "Profile registered twice: {}",
                    profile.identifier()
                )));
            }
            catalog.profiles.push(Arc::new(profile));
        }
        info!(profiles = catalog.profiles.len(), "Profile catalog loaded");
        Ok(catalog)
    }

    /// Catalog with the profiles shipped in this crate
    pub fn builtin() -> Result<Self> {
        Self::new(vec![pcdm::profile()?])
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<DomainProfile>> {
        self.profiles
            .iter()
            .find(|p| p.identifier() == identifier)
            .cloned()
    }

    /// Resolve by identifier, falling back to a case-insensitive label match
    pub fn resolve(&self, key: &str) -> Result<Arc<DomainProfile>> {
        self.get(key)
            .or_else(|| {
                self.profiles
                    .iter()
                    .find(|p| p.label().eq_ignore_ascii_case(key))
                    .cloned()
            })
            .ok_or_else(|| IpmError::Profile(format!("Unknown profile: {}", key)))
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<DomainProfile>> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
