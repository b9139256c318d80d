//! Filesystem-backed object store.
//!
//! Keys map to paths under a root directory. Writes are atomic: bytes go
//! to a uniquely named `.tmp` sibling first, then rename into place, so a
//! crash mid-write never leaves a readable half-object at the canonical
//! path.

use super::{ObjectStore, StoreError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// Staging names carry pid and a counter so concurrent writers of one key
// never share a temp file; each rename publishes one writer's complete
// bytes.
static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FsStore {
    fn name(&self) -> &str {
        "fs"
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(key);
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::Write(format!("key '{key}' has no parent directory")))?;
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::Write(format!("create partition dir: {e}")))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::Write(format!("key '{key}' has no object name")))?;
        let stage_id = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_file_name(format!(
            "{file_name}.{}.{stage_id}.tmp",
            std::process::id()
        ));

        fs::write(&tmp_path, bytes)
            .map_err(|e| StoreError::Write(format!("stage object: {e}")))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Write(format!("publish object: {e}"))
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.object_path(key)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound {
                    key: key.to_string(),
                }
            } else {
                StoreError::Read(format!("read object '{key}': {e}"))
            }
        })
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.object_path(key).exists())
    }

    fn uri(&self, key: &str) -> String {
        format!("file://{}", self.object_path(key).display())
    }
}
