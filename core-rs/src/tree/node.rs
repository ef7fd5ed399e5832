// tree/node.rs - Content node and file metadata
//
// A content node bridges one filesystem entry (or a virtual grouping added by
// an edit) and the domain object that carries its semantic data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::profile::{NodeTypeId, RelationId};

/// Index of a node inside its `ContentTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Directory,
    RegularFile,
}

/// Filesystem metadata captured by the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Location on disk
    pub path: PathBuf,
    pub kind: FileKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Hex-encoded CRC32 of the content, when computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Directory,
            size: 0,
            checksum: None,
            modified: None,
            created: None,
        }
    }

    pub fn regular_file(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::RegularFile,
            size,
            checksum: None,
            modified: None,
            created: None,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::RegularFile
    }
}

/// One element of the content tree
///
/// Structural links (`parent`, `children`) are arena indices owned by the
/// tree; only `ContentTree` mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// `urn:uuid:` URI, unique within the tree
    pub identifier: String,
    /// Display name, usually the file name
    pub name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Relation recorded for the edge to `parent`
    pub parent_relation: Option<RelationId>,
    /// Reference into the external object store
    pub domain_object: Option<String>,
    pub file_info: Option<FileInfo>,
    pub node_type: Option<NodeTypeId>,
    pub sub_node_types: Vec<NodeTypeId>,
    /// Ignored nodes (and everything below them) are skipped by the engine
    pub ignored: bool,
}

impl ContentNode {
    /// Untyped node with a freshly minted identifier
    pub fn new(name: impl Into<String>, file_info: Option<FileInfo>) -> Self {
        Self {
            identifier: mint_identifier(),
            name: name.into(),
            parent: None,
            children: Vec::new(),
            parent_relation: None,
            domain_object: None,
            file_info,
            node_type: None,
            sub_node_types: Vec::new(),
            ignored: false,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        let name = name.into();
        let info = FileInfo::directory(name.clone());
        Self::new(name, Some(info))
    }

    pub fn regular_file(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let info = FileInfo::regular_file(name.clone(), size);
        Self::new(name, Some(info))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn file_kind(&self) -> Option<FileKind> {
        self.file_info.as_ref().map(|info| info.kind)
    }

    pub fn is_typed(&self) -> bool {
        self.node_type.is_some()
    }

    /// Drop type, relation and object reference, keeping file metadata
    pub fn clear_typing(&mut self) {
        self.node_type = None;
        self.sub_node_types.clear();
        self.parent_relation = None;
        self.domain_object = None;
    }
}

pub(crate) fn mint_identifier() -> String {
    format!("urn:uuid:{}", uuid::Uuid::new_v4())
}
