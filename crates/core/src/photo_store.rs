//! On-disk photo files, one per record.
//!
//! Files live flat in a root directory and are named `<uuid>_<original-name>`.
//! The name is the photo's key and is what records store as their reference.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Filesystem store for record photos.
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a fresh `<uuid>_<original_name>` key and return it.
    ///
    /// The file is created with create-new semantics, so a key collision is an
    /// error rather than an overwrite. A partially written file is removed.
    pub fn save(&self, bytes: &[u8], original_name: &str) -> Result<String> {
        let base = base_name(original_name)?;
        let key = format!("{}_{}", Uuid::new_v4(), base);
        let path = self.root.join(&key);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| Error::PhotoIo {
                key: key.clone(),
                source,
            })?;

        if let Err(source) = file.write_all(bytes).and_then(|_| file.sync_all()) {
            drop(file);
            remove_partial(&path, &key, &source);
            return Err(Error::PhotoIo { key, source });
        }

        debug!(key = %key, size = bytes.len(), "photo saved");
        Ok(key)
    }

    /// Remove the file for `key`. Missing files are an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        fs::remove_file(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => Error::PhotoNotFound(key.to_string()),
            _ => Error::PhotoIo {
                key: key.to_string(),
                source,
            },
        })?;
        debug!(key = %key, "photo deleted");
        Ok(())
    }

    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path(key)?;
        fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => Error::PhotoNotFound(key.to_string()),
            _ => Error::PhotoIo {
                key: key.to_string(),
                source,
            },
        })
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path(key)?.is_file())
    }

    /// Resolve a key to its on-disk path. Keys must be plain file names.
    pub fn path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Keys of every file in the store, sorted.
    pub fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() {
                keys.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Remove a file left behind by a failed write. Returns whether it is gone.
fn remove_partial(path: &Path, key: &str, cause: &std::io::Error) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(key = %key, error = %cause, "removed partially written photo");
            true
        }
        Err(cleanup) => {
            warn!(
                key = %key,
                error = %cause,
                cleanup_error = %cleanup,
                "could not remove partially written photo"
            );
            false
        }
    }
}

/// Final path component of an uploaded file name, otherwise unchanged.
fn base_name(original_name: &str) -> Result<String> {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        return Err(Error::InvalidPhotoKey(original_name.to_string()));
    }
    Ok(base.to_string())
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(Error::InvalidPhotoKey(key.to_string()));
    }
    Ok(())
}
