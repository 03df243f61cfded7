//! Remote capability surface
//!
//! The shell never touches the host filesystem directly. Everything it knows
//! about files comes through [`RemoteFs`], a narrow client API onto the
//! sandboxed environment:
//! - list directory entries
//! - stat a path
//! - read a path
//! - write a path
//!
//! Two backends ship with the crate: [`SandboxFs`] serves a host directory as
//! the remote namespace, [`MemoryFs`] keeps a tree in memory.

pub mod memory;
pub mod sandbox;

use std::io;
use std::time::SystemTime;
use thiserror::Error;

use crate::shell::path::VirtualPath;

pub use memory::MemoryFs;
pub use sandbox::SandboxFs;

/// Failure kinds reported by the remote side.
///
/// The kind survives all the way to the operator-visible message, so
/// `ls /nope` reports "no such file or directory" rather than a generic I/O
/// failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: permission denied")]
    PermissionDenied(String),

    #[error("{0}: not a directory")]
    NotADirectory(String),

    #[error("{0}: is a directory")]
    IsADirectory(String),

    #[error("{path}: {message}")]
    Other { path: String, message: String },
}

impl RemoteError {
    /// Classify a host I/O error for `path`.
    pub fn from_io(path: &VirtualPath, err: &io::Error) -> Self {
        let path = path.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => RemoteError::NotFound(path),
            io::ErrorKind::PermissionDenied => RemoteError::PermissionDenied(path),
            io::ErrorKind::NotADirectory => RemoteError::NotADirectory(path),
            io::ErrorKind::IsADirectory => RemoteError::IsADirectory(path),
            _ => RemoteError::Other {
                path,
                message: err.to_string(),
            },
        }
    }
}

/// Kind of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl FileKind {
    /// Single-letter marker used by `ls -l`.
    pub fn marker(self) -> char {
        match self {
            FileKind::File => '-',
            FileKind::Directory => 'd',
            FileKind::Symlink => 'l',
            FileKind::Other => '?',
        }
    }
}

/// Metadata for a remote entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub kind: FileKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// The one capability glob expansion needs.
pub trait DirectoryLister {
    /// Names of the entries of directory `path` (without `.` and `..`).
    fn list_entries(&self, path: &VirtualPath) -> Result<Vec<String>, RemoteError>;
}

/// Full capability set handed to commands.
pub trait RemoteFs: DirectoryLister {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo, RemoteError>;

    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>, RemoteError>;

    /// Create or replace the file at `path`.
    fn write(&self, path: &VirtualPath, data: &[u8]) -> Result<(), RemoteError>;

    fn exists(&self, path: &VirtualPath) -> bool {
        self.stat(path).is_ok()
    }

    fn is_dir(&self, path: &VirtualPath) -> bool {
        self.stat(path).map(|info| info.is_dir()).unwrap_or(false)
    }
}
