//! Error types for IPM Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpmError {
    #[error("No eligible type for node {node} ({reason})")]
    NoEligibleType { node: String, reason: String },

    #[error("Constraint violation at node {node}: {detail}")]
    ConstraintViolation { node: String, detail: String },

    #[error("Illegal transform '{transform}' for node {node}")]
    IllegalTransform { node: String, transform: String },

    #[error("Profile mismatch: tree typed by {tree_profile}, engine uses {engine_profile}")]
    ProfileMismatch {
        tree_profile: String,
        engine_profile: String,
    },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Invalid tree edit: {0}")]
    InvalidTreeEdit(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<crate::profile::ProfileError> for IpmError {
    fn from(err: crate::profile::ProfileError) -> Self {
        IpmError::Profile(err.to_string())
    }
}

impl From<walkdir::Error> for IpmError {
    fn from(err: walkdir::Error) -> Self {
        IpmError::Scan(err.to_string())
    }
}

impl IpmError {
    /// True for the three engine-level failures a caller may recover from
    /// by picking another type, transform or profile.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IpmError::NoEligibleType { .. }
                | IpmError::ConstraintViolation { .. }
                | IpmError::IllegalTransform { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IpmError>;
