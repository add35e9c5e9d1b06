/// Root-confined file and directory access, backing the generic
/// `/api/boards/{boardId}/{*path}` and `/api/uploads/{*path}` endpoints.
///
/// Every relative path is normalised lexically and then checked against the
/// canonical root, so neither `..` segments nor symlinks can reach outside it.
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use super::local::LocalStorage;
use super::StorageError;
use crate::types::{EntryKind, FileEntry};

#[derive(Debug, Clone)]
pub struct FileTree {
    root: PathBuf,
}

impl FileTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a client-supplied relative path to an absolute path inside the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let traversal = || StorageError::PathTraversal(relative.to_string());
        if relative.contains('\0') {
            return Err(traversal());
        }

        let mut normalized = PathBuf::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(traversal());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(traversal()),
            }
        }

        let candidate = self.root.join(&normalized);
        let canonical_root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        // The deepest existing ancestor decides where symlinks actually lead.
        for ancestor in candidate.ancestors() {
            if !ancestor.starts_with(&self.root) {
                break;
            }
            if let Ok(real) = fs::canonicalize(ancestor) {
                if !real.starts_with(&canonical_root) {
                    log::warn!(
                        target: "lanes.storage.files",
                        "Rejected path {:?}: resolves to {} outside {}",
                        relative,
                        real.display(),
                        canonical_root.display()
                    );
                    return Err(traversal());
                }
                break;
            }
        }
        Ok(candidate)
    }

    pub fn stat(&self, relative: &str) -> Result<EntryKind, StorageError> {
        let path = self.resolve(relative)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(EntryKind::Directory),
            Ok(_) => Ok(EntryKind::File),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound(relative.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Directory entries sorted by name; dot-files and `__MACOSX` are hidden.
    pub fn list_dir(&self, relative: &str) -> Result<Vec<FileEntry>, StorageError> {
        let path = self.resolve(relative)?;
        let entries = match fs::read_dir(&path) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound(relative.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<FileEntry> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if name.starts_with('.') || name.starts_with("__MACOSX") {
                    return None;
                }
                let kind = if entry.path().is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                Some(FileEntry { name, kind })
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub fn read(&self, relative: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(relative)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound(relative.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write a file, creating parent directories as needed.
    pub fn write(&self, relative: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.resolve(relative)?;
        if path == self.root || path.is_dir() {
            return Err(StorageError::Validation(format!(
                "{} is a directory",
                relative
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        LocalStorage::atomic_write(&path, data)?;
        log::debug!(
            target: "lanes.storage.files",
            "Wrote {} bytes to {}",
            data.len(),
            path.display()
        );
        Ok(path)
    }

    pub fn mkdir(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = self.resolve(relative)?;
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Delete a file or directory tree. Returns `false` if nothing was there.
    pub fn delete(&self, relative: &str) -> Result<bool, StorageError> {
        let path = self.resolve(relative)?;
        if path == self.root {
            return Err(StorageError::Validation(
                "refusing to delete the root directory".to_string(),
            ));
        }
        let removed = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => LocalStorage::remove_dir_if_exists(&path)?,
            Ok(_) => LocalStorage::remove_file_if_exists(&path)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        if removed {
            log::info!(target: "lanes.storage.files", "Deleted {}", path.display());
        }
        Ok(removed)
    }
}

/// Strong ETag for file content: quoted first 16 hex chars of its SHA-256.
pub fn content_etag(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    format!("\"{}\"", hex::encode(&digest[..8]))
}
