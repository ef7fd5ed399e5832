// tree/mod.rs - Content tree subsystem

pub mod arena;
pub mod node;
pub mod scanner;

pub use arena::ContentTree;
pub use node::{ContentNode, FileInfo, FileKind, NodeId};
pub use scanner::{checksum_file, FilesystemScanner, TreeSource};
