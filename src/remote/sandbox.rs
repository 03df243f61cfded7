//! Host directory served as the remote namespace
//!
//! Remote `/` maps to the sandbox root. Virtual paths are already normalized,
//! so `..` can never climb out; symlinks that resolve outside the root are
//! refused with permission denied.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{DirectoryLister, FileInfo, FileKind, RemoteError, RemoteFs};
use crate::shell::path::VirtualPath;

#[derive(Debug, Clone)]
pub struct SandboxFs {
    root: PathBuf,
}

impl SandboxFs {
    /// Serve `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .with_context(|| format!("cannot open sandbox root {}", root.display()))?;
        if !root.is_dir() {
            anyhow::bail!("sandbox root {} is not a directory", root.display());
        }
        log::info!("serving sandbox root {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: &VirtualPath) -> PathBuf {
        let mut host = self.root.clone();
        host.extend(path.segments());
        host
    }

    /// Host path for `path`, refusing anything whose real location is outside
    /// the root.
    fn contained(&self, path: &VirtualPath) -> Result<PathBuf, RemoteError> {
        let host = self.host_path(path);
        match host.canonicalize() {
            Ok(real) if real.starts_with(&self.root) => Ok(host),
            Ok(_) => Err(RemoteError::PermissionDenied(path.to_string())),
            Err(e) => Err(RemoteError::from_io(path, &e)),
        }
    }

    /// Host path of the entry named by `path` without following a final
    /// symlink. The parent must be a directory inside the root.
    fn entry_path(&self, path: &VirtualPath) -> Result<PathBuf, RemoteError> {
        let Some(name) = path.file_name() else {
            return Ok(self.root.clone());
        };
        let parent = path.parent();
        let parent_host = self.contained(&parent)?;
        if !parent_host.is_dir() {
            return Err(RemoteError::NotADirectory(parent.to_string()));
        }
        Ok(parent_host.join(name))
    }
}

impl DirectoryLister for SandboxFs {
    fn list_entries(&self, path: &VirtualPath) -> Result<Vec<String>, RemoteError> {
        let host = self.contained(path)?;
        let entries = fs::read_dir(&host).map_err(|e| RemoteError::from_io(path, &e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RemoteError::from_io(path, &e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

impl RemoteFs for SandboxFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo, RemoteError> {
        let host = self.entry_path(path)?;
        let meta = fs::symlink_metadata(&host).map_err(|e| RemoteError::from_io(path, &e))?;
        let file_type = meta.file_type();
        let kind = if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else if file_type.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Other
        };
        Ok(FileInfo {
            name: path.file_name().unwrap_or("/").to_string(),
            kind,
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>, RemoteError> {
        let host = self.contained(path)?;
        if host.is_dir() {
            return Err(RemoteError::IsADirectory(path.to_string()));
        }
        fs::read(&host).map_err(|e| RemoteError::from_io(path, &e))
    }

    fn write(&self, path: &VirtualPath, data: &[u8]) -> Result<(), RemoteError> {
        if path.is_root() {
            return Err(RemoteError::IsADirectory(path.to_string()));
        }
        let host = self.entry_path(path)?;
        if let Ok(meta) = fs::symlink_metadata(&host) {
            if meta.file_type().is_symlink() {
                // dangling links would create their target, wherever it is
                match host.canonicalize() {
                    Ok(real) if real.starts_with(&self.root) => {}
                    _ => return Err(RemoteError::PermissionDenied(path.to_string())),
                }
            }
        }
        if host.is_dir() {
            return Err(RemoteError::IsADirectory(path.to_string()));
        }
        fs::write(&host, data).map_err(|e| RemoteError::from_io(path, &e))
    }
}
