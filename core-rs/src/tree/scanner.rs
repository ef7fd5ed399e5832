// tree/scanner.rs - Filesystem scanner producing untyped content trees
//
// Walks a directory with walkdir (sorted by file name so repeated scans give
// the same shape) and records size, timestamps and an optional CRC32 per file.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::arena::ContentTree;
use super::node::{ContentNode, FileInfo, FileKind, NodeId};
use crate::config::ScannerConfig;
use crate::errors::{IpmError, Result};

/// Anything that can produce an untyped content tree from a path
pub trait TreeSource {
    fn build_tree(&self, path: &Path) -> Result<ContentTree>;
}

/// Scanner over the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FilesystemScanner {
    options: ScannerConfig,
}

impl FilesystemScanner {
    pub fn new(options: ScannerConfig) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScannerConfig {
        &self.options
    }

    fn file_info(&self, entry: &DirEntry, kind: FileKind) -> Result<FileInfo> {
        let metadata = entry.metadata()?;
        let checksum = if kind == FileKind::RegularFile && self.options.checksums {
            Some(crc32_of(entry.path())?)
        } else {
            None
        };
        Ok(FileInfo {
            path: entry.path().to_path_buf(),
            kind,
            size: if kind == FileKind::RegularFile { metadata.len() } else { 0 },
            checksum,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            created: metadata.created().ok().map(DateTime::<Utc>::from),
        })
    }
}

impl TreeSource for FilesystemScanner {
    fn build_tree(&self, path: &Path) -> Result<ContentTree> {
        if !path.exists() {
            return Err(IpmError::Scan(format!("path not found: {}", path.display())));
        }

        let include_hidden = self.options.include_hidden;
        let walker = WalkDir::new(path)
            .follow_links(self.options.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| include_hidden || e.depth() == 0 || !is_hidden(e));

        let mut tree: Option<ContentTree> = None;
        let mut ids: HashMap<PathBuf, NodeId> = HashMap::new();
        let mut skipped = 0usize;

        for entry in walker {
            let entry = entry?;
            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                FileKind::Directory
            } else if file_type.is_file() {
                FileKind::RegularFile
            } else {
                debug!(path = %entry.path().display(), "Skipping special file");
                skipped += 1;
                continue;
            };

            let name = entry.file_name().to_string_lossy().to_string();
            let node = ContentNode::new(name, Some(self.file_info(&entry, kind)?));

            let id = match tree.as_mut() {
                None => {
                    let (t, root) = ContentTree::with_root(node);
                    tree = Some(t);
                    root
                }
                Some(t) => {
                    let parent = entry
                        .path()
                        .parent()
                        .and_then(|p| ids.get(p))
                        .copied()
                        .ok_or_else(|| {
                            IpmError::Scan(format!("orphaned entry: {}", entry.path().display()))
                        })?;
                    t.add_child(parent, node)?
                }
            };
            if kind == FileKind::Directory {
                ids.insert(entry.path().to_path_buf(), id);
            }
        }

        let tree = tree.ok_or_else(|| {
            IpmError::Scan(format!("nothing to scan at {}", path.display()))
        })?;
        if skipped > 0 {
            warn!(skipped, "Special files were left out of the tree");
        }
        info!(path = %path.display(), nodes = tree.len(), "Scanned content tree");
        Ok(tree)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn crc32_of(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:08x}", hasher.finalize()))
}

/// CRC32 of a file on disk, formatted like scanner checksums
pub fn checksum_file(path: &Path) -> Result<String> {
    if !fs::metadata(path)?.is_file() {
        return Err(IpmError::Scan(format!("not a regular file: {}", path.display())));
    }
    crc32_of(path)
}
