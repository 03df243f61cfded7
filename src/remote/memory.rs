//! In-memory remote tree
//!
//! Used by the test suite as the remote fixture, and handy for scripted
//! sessions that should not touch any host directory.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::SystemTime;

use super::{DirectoryLister, FileInfo, FileKind, RemoteError, RemoteFs};
use crate::shell::path::VirtualPath;

#[derive(Debug, Clone)]
enum NodeData {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    readable: bool,
    modified: SystemTime,
}

impl Node {
    fn dir() -> Self {
        Self { data: NodeData::Dir, readable: true, modified: SystemTime::now() }
    }

    fn file(content: Vec<u8>) -> Self {
        Self { data: NodeData::File(content), readable: true, modified: SystemTime::now() }
    }
}

#[derive(Debug)]
pub struct MemoryFs {
    nodes: RefCell<BTreeMap<VirtualPath, Node>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(VirtualPath::root(), Node::dir());
        Self { nodes: RefCell::new(nodes) }
    }

    /// Create `path` and any missing ancestors as directories.
    pub fn add_dir(&self, path: &str) -> &Self {
        let path = VirtualPath::new(path);
        self.ensure_dirs(&path);
        self
    }

    /// Create a file, creating missing ancestors.
    pub fn add_file(&self, path: &str, content: &[u8]) -> &Self {
        let path = VirtualPath::new(path);
        self.ensure_dirs(&path.parent());
        self.nodes.borrow_mut().insert(path, Node::file(content.to_vec()));
        self
    }

    /// Make `path` unreadable: listing or reading it reports permission denied.
    pub fn deny(&self, path: &str) -> &Self {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&VirtualPath::new(path)) {
            node.readable = false;
        }
        self
    }

    fn ensure_dirs(&self, path: &VirtualPath) {
        let mut nodes = self.nodes.borrow_mut();
        let mut current = VirtualPath::root();
        let segments: Vec<String> = path.segments().map(str::to_string).collect();
        for segment in segments {
            current = current.join(&segment);
            nodes.entry(current.clone()).or_insert_with(Node::dir);
        }
    }

    fn lookup(&self, path: &VirtualPath) -> Result<Node, RemoteError> {
        self.nodes
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryLister for MemoryFs {
    fn list_entries(&self, path: &VirtualPath) -> Result<Vec<String>, RemoteError> {
        let node = self.lookup(path)?;
        if !node.readable {
            return Err(RemoteError::PermissionDenied(path.to_string()));
        }
        if let NodeData::File(_) = node.data {
            return Err(RemoteError::NotADirectory(path.to_string()));
        }

        let nodes = self.nodes.borrow();
        let names = nodes
            .keys()
            .filter(|p| !p.is_root() && p.parent() == *path)
            .filter_map(|p| p.file_name().map(str::to_string))
            .collect();
        Ok(names)
    }
}

impl RemoteFs for MemoryFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo, RemoteError> {
        let node = self.lookup(path)?;
        let (kind, size) = match &node.data {
            NodeData::Dir => (FileKind::Directory, 0),
            NodeData::File(content) => (FileKind::File, content.len() as u64),
        };
        Ok(FileInfo {
            name: path.file_name().unwrap_or("/").to_string(),
            kind,
            size,
            modified: Some(node.modified),
        })
    }

    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>, RemoteError> {
        let node = self.lookup(path)?;
        if !node.readable {
            return Err(RemoteError::PermissionDenied(path.to_string()));
        }
        match node.data {
            NodeData::Dir => Err(RemoteError::IsADirectory(path.to_string())),
            NodeData::File(content) => Ok(content),
        }
    }

    fn write(&self, path: &VirtualPath, data: &[u8]) -> Result<(), RemoteError> {
        if path.is_root() {
            return Err(RemoteError::IsADirectory(path.to_string()));
        }
        let parent = self.lookup(&path.parent())?;
        if let NodeData::File(_) = parent.data {
            return Err(RemoteError::NotADirectory(path.parent().to_string()));
        }
        if let Ok(existing) = self.lookup(path) {
            if let NodeData::Dir = existing.data {
                return Err(RemoteError::IsADirectory(path.to_string()));
            }
        }
        self.nodes.borrow_mut().insert(path.clone(), Node::file(data.to_vec()));
        Ok(())
    }
}
