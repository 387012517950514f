//! Rename Tracking
//!
//! `moveFile` stages a rename in `renameLog` with a pending marker; the next
//! checkpoint promotes it to a real `changeType: renamed` FileState (see
//! `save_checkpoint::fold_in_pending_renames`). `historyByInode` answers
//! "where has this file lived" across renames.

use std::sync::Arc;

use crate::domain::manifest::{Manifest, RenameEntry};
use crate::domain::version::ChangeType;
use crate::error::{JcfError, JcfResult};
use crate::ports::StoragePort;

pub use crate::application::save_checkpoint::PENDING_RENAME_MARKER;

#[derive(Debug, Clone)]
pub struct MoveFileInput {
    pub from: String,
    pub to: String,
    pub replace: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryEntry {
    pub version_id: String,
    pub path: String,
    pub change_type: Option<ChangeType>,
}

pub struct MoveFileUseCase<S> {
    storage: Arc<S>,
}

impl<S: StoragePort> MoveFileUseCase<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn execute(&self, manifest: &mut Manifest, input: MoveFileInput) -> JcfResult<()> {
        let entry = manifest
            .file_map
            .get(&input.from)
            .ok_or_else(|| JcfError::NotFound(input.from.clone()))?
            .clone();

        if manifest.file_map.contains_key(&input.to) && !input.replace {
            return Err(JcfError::AlreadyExists(input.to.clone()));
        }
        if input.replace {
            if let Some(old) = manifest.file_map.remove(&input.to) {
                let _ = old;
                let _ = self
                    .storage
                    .delete(&format!("content/{}", input.to))
                    .await;
            }
        }

        self.storage
            .rename(
                &format!("content/{}", input.from),
                &format!("content/{}", input.to),
            )
            .await
            .map_err(JcfError::from)?;

        manifest.file_map.remove(&input.from);
        manifest.file_map.insert(input.to.clone(), entry.clone());

        manifest.rename_log.push(RenameEntry {
            inode_id: entry.inode_id,
            from_path: input.from,
            to_path: input.to,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version_id: PENDING_RENAME_MARKER.to_string(),
        });

        Ok(())
    }

    /// `(versionId, path-at-that-version, changeType)` for every version
    /// touching `inode_id`, in history order. Current path is resolved
    /// separately by scanning `fileMap`.
    pub fn history_by_inode(&self, manifest: &Manifest, inode_id: &str) -> Vec<HistoryEntry> {
        let mut out = Vec::new();
        for version in &manifest.version_history {
            for (path, state) in &version.file_states {
                if state.inode_id == inode_id {
                    out.push(HistoryEntry {
                        version_id: version.id.clone(),
                        path: path.clone(),
                        change_type: state.change_type,
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::{FileEntry, FileType, ProjectMetadata};
    use crate::infrastructure::MemoryStorage;

    fn manifest_with_file() -> Manifest {
        let mut manifest = Manifest::new(
            ProjectMetadata {
                author: "tester".to_string(),
                description: None,
                created: "2024-01-01T00:00:00Z".to_string(),
                last_modified: "2024-01-01T00:00:00Z".to_string(),
                application: "jcf".to_string(),
                tags: None,
                extra: None,
            },
            crate::config::EngineConfig::default(),
        );
        manifest.file_map.insert(
            "old.txt".to_string(),
            FileEntry {
                inode_id: "inode-1".to_string(),
                file_type: FileType::Text,
                encoding: Some("utf-8".to_string()),
                current_hash: None,
                size: None,
                mime: None,
                created: "2024-01-01T00:00:00Z".to_string(),
                modified: "2024-01-01T00:00:00Z".to_string(),
                extra: None,
            },
        );
        manifest
    }

    #[tokio::test]
    async fn move_preserves_inode_and_stages_rename() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write("content/old.txt", b"hi").await.unwrap();
        let mut manifest = manifest_with_file();

        let uc = MoveFileUseCase::new(storage.clone());
        uc.execute(
            &mut manifest,
            MoveFileInput {
                from: "old.txt".to_string(),
                to: "new.txt".to_string(),
                replace: false,
            },
        )
        .await
        .unwrap();

        assert!(!manifest.file_map.contains_key("old.txt"));
        assert_eq!(manifest.file_map["new.txt"].inode_id, "inode-1");
        assert_eq!(manifest.rename_log.len(), 1);
        assert_eq!(manifest.rename_log[0].version_id, PENDING_RENAME_MARKER);
        assert!(storage.exists("content/new.txt").await.unwrap());
    }

    #[tokio::test]
    async fn move_rejects_existing_destination_without_replace() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write("content/old.txt", b"hi").await.unwrap();
        storage.write("content/new.txt", b"there").await.unwrap();
        let mut manifest = manifest_with_file();
        manifest.file_map.insert(
            "new.txt".to_string(),
            manifest.file_map["old.txt"].clone(),
        );

        let uc = MoveFileUseCase::new(storage);
        let result = uc
            .execute(
                &mut manifest,
                MoveFileInput {
                    from: "old.txt".to_string(),
                    to: "new.txt".to_string(),
                    replace: false,
                },
            )
            .await;

        assert!(matches!(result, Err(JcfError::AlreadyExists(_))));
    }
}
