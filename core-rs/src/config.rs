/**
 * config.rs
 * Engine configuration (YAML format)
 *
 * Format:
 * ```yaml
 * apiVersion: ipm/v1
 * kind: EngineConfig
 * metadata:
 *   name: reading-room
 * spec:
 *   profile: https://ipm.example.org/profile/pcdm
 *   assignment:
 *     rollbackOnFailure: false
 *   scanner:
 *     includeHidden: false
 *     followLinks: false
 *     checksums: true
 * ```
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{IpmError, Result};
use crate::profile::pcdm;

pub const API_VERSION: &str = "ipm/v1";
pub const KIND: &str = "EngineConfig";

/// Engine configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Spec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Identifier (or label) of the default domain profile
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            assignment: AssignmentConfig::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

/// Type assignment policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentConfig {
    /// Restore the attempted subtree's previous typing when assignment fails
    #[serde(default)]
    pub rollback_on_failure: bool,
}

/// Filesystem scanner options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScannerConfig {
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default)]
    pub follow_links: bool,
    #[serde(default = "default_true")]
    pub checksums: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            follow_links: false,
            checksums: true,
        }
    }
}

fn default_profile() -> String {
    pcdm::PROFILE_ID.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("default")
    }
}

impl EngineConfig {
    pub fn new(name: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: Metadata {
                name: name.to_string(),
            },
            spec: Spec::default(),
        }
    }

    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IpmError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Ensures apiVersion, kind and the required names are set
    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(IpmError::Config(format!(
                "Invalid apiVersion: expected '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }
        if self.kind != KIND {
            return Err(IpmError::Config(format!(
                "Invalid kind: expected '{}', got '{}'",
                KIND, self.kind
            )));
        }
        if self.metadata.name.is_empty() {
            return Err(IpmError::Config("metadata.name cannot be empty".to_string()));
        }
        if self.spec.profile.is_empty() {
            return Err(IpmError::Config("spec.profile cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }
}
