//! # Remove File Use Case
//!
//! `removeFile` deletes a path's content from the working copy only.
//! `fileMap` bookkeeping (and the `Deleted` `FileState`) is produced by the
//! next `saveCheckpoint`'s `identify_changes` scan, same as any other
//! working-copy edit — removing the `fileMap` entry here too would make the
//! deletion invisible to that scan and silently drop it from history.

use std::sync::Arc;

use crate::domain::manifest::Manifest;
use crate::error::{JcfError, JcfResult};
use crate::ports::StoragePort;

pub struct RemoveFileUseCase<S> {
    storage: Arc<S>,
}

impl<S: StoragePort> RemoveFileUseCase<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn execute(&self, manifest: &Manifest, path: &str) -> JcfResult<()> {
        if !manifest.file_map.contains_key(path) {
            return Err(JcfError::NotFound(path.to_string()));
        }
        let key = format!("content/{path}");
        if self.storage.exists(&key).await? {
            self.storage.delete(&key).await?;
        }
        Ok(())
    }
}
