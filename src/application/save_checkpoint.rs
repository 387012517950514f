//! # Save Checkpoint Use Case
//!
//! Creates a new version (checkpoint) of the project state. HEAD is always
//! full content; history is reverse patches transforming the new HEAD back
//! to its parent.
//!
//! `content/**` is the live working copy: callers edit it directly, so by
//! the time `execute` runs, a modified path's bytes already hold the *new*
//! content. To diff against the *old* HEAD content for that path, this use
//! case keeps a shadow cache of the last-committed text under
//! `.store/head_text/<pathKey>`, refreshed on every successful commit. This
//! holds exactly one generation per path (not accumulated history) and is
//! purely a staging aid; nothing about it is part of the durable format the
//! manifest or delta store describe.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;

use crate::application::add_file::classify_is_text;
use crate::config::EngineConfig;
use crate::domain::manifest::{FileEntry, FileType, Manifest, RenameEntry};
use crate::domain::normalize::normalize_text;
use crate::domain::version::{ChangeType, FileState, Version};
use crate::error::{JcfError, JcfResult};
use crate::infrastructure::delta_store::{path_key, DeltaStore};
use crate::infrastructure::BlobStore;
use crate::observer::{null_observer, Observer};
use crate::ports::{DiffPort, HasherPort, StoragePort};

pub(crate) const HEAD_TEXT_PREFIX: &str = ".store/head_text/";
pub const PENDING_RENAME_MARKER: &str = "pending";

#[derive(Debug, Clone)]
pub struct SaveCheckpointInput {
    pub message: String,
    pub author: String,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct SaveCheckpointOutput {
    pub version_id: String,
    pub files_added: usize,
    pub files_modified: usize,
    pub files_deleted: usize,
    pub files_renamed: usize,
}

#[derive(Debug, Clone)]
pub enum FileChange {
    Added { path: String, hash: String, is_text: bool },
    Modified { path: String, new_hash: String },
    Deleted { path: String },
    Renamed { inode_id: String, from_path: String, to_path: String },
}

pub struct SaveCheckpointUseCase<S, D, H> {
    storage: Arc<S>,
    diff: Arc<D>,
    hasher: Arc<H>,
    blob_store: BlobStore<S, H>,
    delta_store: DeltaStore<S>,
    config: EngineConfig,
    observer: Arc<dyn Observer>,
}

impl<S, D, H> SaveCheckpointUseCase<S, D, H>
where
    S: StoragePort,
    D: DiffPort,
    H: HasherPort,
{
    pub fn new(storage: Arc<S>, diff: Arc<D>, hasher: Arc<H>, config: EngineConfig) -> Self {
        let blob_store = BlobStore::new(
            storage.clone(),
            hasher.clone(),
            config.max_blob_size_bytes,
        );
        let delta_store = DeltaStore::new(storage.clone());
        Self {
            storage,
            diff,
            hasher,
            blob_store,
            delta_store,
            config,
            observer: null_observer(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    #[instrument(skip(self, manifest, input))]
    pub async fn execute(
        &self,
        manifest: &mut Manifest,
        input: SaveCheckpointInput,
    ) -> JcfResult<SaveCheckpointOutput> {
        let version_id = uuid::Uuid::new_v4().to_string();
        let parent_id = manifest.head().map(str::to_string);

        let changes = self.identify_changes(manifest).await?;
        let changes = self.fold_in_pending_renames(manifest, changes);

        if changes.is_empty() {
            return Err(JcfError::NoChanges);
        }

        self.process_text_files(manifest, &changes, &version_id)
            .await?;
        self.process_binary_files(manifest, &changes).await?;

        let version = self.build_version(&version_id, parent_id, &input, manifest, &changes);

        self.finalize_renames(manifest, &version_id);
        manifest.refs.insert(crate::domain::manifest::HEAD_REF.to_string(), version_id.clone());
        manifest.metadata.last_modified = now();
        self.sync_file_map(manifest, &changes, &version_id);
        manifest.version_history.push(version);

        if self.config.snapshot_interval > 0
            && manifest.version_history.len() as u64 % self.config.snapshot_interval == 0
        {
            self.write_snapshot_cadence(manifest, &version_id).await?;
        }

        self.refresh_head_text_shadow(&changes).await?;

        let (added, modified, deleted, renamed) = count_changes(&changes);
        Ok(SaveCheckpointOutput {
            version_id,
            files_added: added,
            files_modified: modified,
            files_deleted: deleted,
            files_renamed: renamed,
        })
    }

    async fn identify_changes(&self, manifest: &Manifest) -> JcfResult<Vec<FileChange>> {
        let mut changes = Vec::new();
        let current_files = self.list_content_recursive().await?;
        let current_set: HashSet<&String> = current_files.iter().collect();

        for path in &current_files {
            self.observer.on_event(crate::observer::Event::Scan {
                path: path.clone(),
            });
            let content = self.storage.read(&format!("content/{path}")).await?;
            let current_hash = self.hasher.hash(&content);

            match manifest.file_map.get(path) {
                Some(entry) if entry.current_hash.as_deref() == Some(current_hash.as_str()) => {}
                Some(_) => changes.push(FileChange::Modified {
                    path: path.clone(),
                    new_hash: current_hash,
                }),
                None => changes.push(FileChange::Added {
                    path: path.clone(),
                    hash: current_hash,
                    is_text: classify_is_text(path, &content),
                }),
            }
        }

        for path in manifest.file_map.keys() {
            if !current_set.contains(path) {
                changes.push(FileChange::Deleted { path: path.clone() });
            }
        }

        Ok(changes)
    }

    /// Promote any `RenameEntry` staged by `moveFile` since the last
    /// checkpoint into a `Renamed` change, cancelling out the matching
    /// added/deleted pair this scan would otherwise have produced.
    fn fold_in_pending_renames(
        &self,
        manifest: &Manifest,
        mut changes: Vec<FileChange>,
    ) -> Vec<FileChange> {
        let pending: Vec<&RenameEntry> = manifest
            .rename_log
            .iter()
            .filter(|r| r.version_id == PENDING_RENAME_MARKER)
            .collect();

        for rename in pending {
            let added_idx = changes.iter().position(|c| {
                matches!(c, FileChange::Added { path, .. } if path == &rename.to_path)
            });
            let deleted_idx = changes.iter().position(|c| {
                matches!(c, FileChange::Deleted { path } if path == &rename.from_path)
            });
            if let (Some(ai), Some(di)) = (added_idx, deleted_idx) {
                let (keep, drop) = if ai > di { (ai, di) } else { (di, ai) };
                changes.remove(keep);
                changes.remove(drop);
                changes.push(FileChange::Renamed {
                    inode_id: rename.inode_id.clone(),
                    from_path: rename.from_path.clone(),
                    to_path: rename.to_path.clone(),
                });
            }
        }
        changes
    }

    fn finalize_renames(&self, manifest: &mut Manifest, version_id: &str) {
        for entry in manifest.rename_log.iter_mut() {
            if entry.version_id == PENDING_RENAME_MARKER {
                entry.version_id = version_id.to_string();
            }
        }
    }

    async fn process_text_files(
        &self,
        manifest: &Manifest,
        changes: &[FileChange],
        version_id: &str,
    ) -> JcfResult<()> {
        for change in changes {
            let FileChange::Modified { path, .. } = change else {
                continue;
            };
            if !self.is_text_path(manifest, path) {
                continue;
            }

            let new_bytes = self.storage.read(&format!("content/{path}")).await?;
            let new_text = normalize_text(&String::from_utf8_lossy(&new_bytes));
            let old_text = normalize_text(&self.read_head_text_shadow(path).await?);

            if self.hasher.hash(new_text.as_bytes()) == self.hasher.hash(old_text.as_bytes()) {
                continue;
            }

            let reverse_patch = self.diff.compute_diff(&new_text, &old_text);
            let round_trip = self
                .diff
                .apply_patch(&new_text, &reverse_patch)
                .map_err(|e| JcfError::PatchSynthesisFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            if round_trip != old_text {
                return Err(JcfError::PatchSynthesisFailed {
                    path: path.clone(),
                    reason: "round-trip verification failed".to_string(),
                });
            }

            let key = path_key(&*self.hasher, path);
            if reverse_patch.len() as f64 > 0.5 * new_text.len() as f64 {
                self.delta_store
                    .put_snapshot(version_id, &key, &old_text)
                    .await?;
            } else {
                self.delta_store
                    .put_delta(version_id, &key, &reverse_patch)
                    .await?;
            }
            self.observer.on_event(crate::observer::Event::Diff {
                path: path.clone(),
                patch_bytes: reverse_patch.len(),
            });
        }
        Ok(())
    }

    async fn process_binary_files(
        &self,
        manifest: &Manifest,
        changes: &[FileChange],
    ) -> JcfResult<()> {
        for change in changes {
            let (path, is_text) = match change {
                FileChange::Added { path, is_text, .. } => (path, *is_text),
                FileChange::Modified { path, .. } => (path, self.is_text_path(manifest, path)),
                _ => continue,
            };
            if is_text {
                continue;
            }
            let content = self.storage.read(&format!("content/{path}")).await?;
            let hash = self.blob_store.put(&content).await?;
            self.observer.on_event(crate::observer::Event::Hash {
                path: path.clone(),
                bytes: content.len(),
            });
            debug_assert_eq!(hash.len(), 64);
        }
        Ok(())
    }

    /// Text-ness of a path already known to `fileMap`. For a path not yet
    /// present (its first checkpoint), callers must classify from content
    /// directly (see `FileChange::Added { is_text, .. }` and
    /// `classify_is_text`) rather than relying on this default, which
    /// assumes binary when nothing is known.
    fn is_text_path(&self, manifest: &Manifest, path: &str) -> bool {
        manifest
            .file_map
            .get(path)
            .map(|e| matches!(e.file_type, FileType::Text))
            .unwrap_or(false)
    }

    fn build_version(
        &self,
        version_id: &str,
        parent_id: Option<String>,
        input: &SaveCheckpointInput,
        manifest: &Manifest,
        changes: &[FileChange],
    ) -> Version {
        let mut file_states: HashMap<String, FileState> = parent_id
            .as_ref()
            .and_then(|p| manifest.version(p))
            .map(|v| v.file_states.clone())
            .unwrap_or_default();

        for change in changes {
            match change {
                FileChange::Added { path, hash, is_text } => {
                    let inode_id = manifest
                        .file_map
                        .get(path)
                        .map(|e| e.inode_id.clone())
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                    let is_text = *is_text;
                    file_states.insert(
                        path.clone(),
                        FileState {
                            inode_id,
                            hash: if is_text { None } else { Some(hash.clone()) },
                            content_ref: None,
                            size: 0,
                            deleted: None,
                            change_type: Some(ChangeType::Added),
                            encrypted: None,
                        },
                    );
                }
                FileChange::Modified { path, new_hash } => {
                    let is_text = self.is_text_path(manifest, path);
                    let key = path_key(&*self.hasher, path);
                    let entry = file_states.entry(path.clone()).or_insert_with(|| FileState {
                        inode_id: manifest
                            .file_map
                            .get(path)
                            .map(|e| e.inode_id.clone())
                            .unwrap_or_default(),
                        hash: None,
                        content_ref: None,
                        size: 0,
                        deleted: None,
                        change_type: None,
                        encrypted: None,
                    });
                    entry.change_type = Some(ChangeType::Modified);
                    if is_text {
                        entry.hash = None;
                        entry.content_ref =
                            Some(crate::infrastructure::delta_store::DeltaStore::<S>::delta_key(
                                version_id, &key,
                            ));
                    } else {
                        entry.hash = Some(new_hash.clone());
                        entry.content_ref = None;
                    }
                }
                FileChange::Deleted { path } => {
                    if let Some(state) = file_states.get_mut(path) {
                        state.deleted = Some(true);
                        state.change_type = Some(ChangeType::Deleted);
                    }
                }
                FileChange::Renamed {
                    inode_id,
                    from_path,
                    to_path,
                } => {
                    let mut state = file_states.remove(from_path).unwrap_or(FileState {
                        inode_id: inode_id.clone(),
                        hash: None,
                        content_ref: None,
                        size: 0,
                        deleted: None,
                        change_type: None,
                        encrypted: None,
                    });
                    state.change_type = Some(ChangeType::Renamed);
                    file_states.insert(to_path.clone(), state);
                }
            }
        }

        Version {
            id: version_id.to_string(),
            parent_id,
            timestamp: now(),
            message: input.message.clone(),
            author: input.author.clone(),
            file_states,
            tags: input.tags.clone(),
            extra: None,
        }
    }

    fn sync_file_map(&self, manifest: &mut Manifest, changes: &[FileChange], _version_id: &str) {
        for change in changes {
            match change {
                FileChange::Added { path, hash, is_text } => {
                    let is_text = *is_text;
                    manifest.file_map.insert(
                        path.clone(),
                        FileEntry {
                            inode_id: uuid::Uuid::new_v4().to_string(),
                            file_type: if is_text { FileType::Text } else { FileType::Binary },
                            encoding: if is_text { Some("utf-8".to_string()) } else { None },
                            current_hash: Some(hash.clone()),
                            size: None,
                            mime: None,
                            created: now(),
                            modified: now(),
                            extra: None,
                        },
                    );
                }
                FileChange::Modified { path, new_hash } => {
                    if let Some(entry) = manifest.file_map.get_mut(path) {
                        entry.current_hash = Some(new_hash.clone());
                        entry.modified = now();
                    }
                }
                FileChange::Deleted { path } => {
                    manifest.file_map.remove(path);
                }
                FileChange::Renamed { to_path, from_path, .. } => {
                    if let Some(mut entry) = manifest.file_map.remove(from_path) {
                        entry.modified = now();
                        manifest.file_map.insert(to_path.clone(), entry);
                    }
                }
            }
        }
    }

    async fn write_snapshot_cadence(&self, manifest: &Manifest, version_id: &str) -> JcfResult<()> {
        let version = manifest
            .version(version_id)
            .ok_or_else(|| JcfError::NotFound(version_id.to_string()))?;
        for (path, state) in &version.file_states {
            if state.is_deleted() || !self.is_text_path(manifest, path) {
                continue;
            }
            let bytes = self.storage.read(&format!("content/{path}")).await?;
            let text = normalize_text(&String::from_utf8_lossy(&bytes));
            let key = path_key(&*self.hasher, path);
            self.delta_store
                .put_snapshot(version_id, &key, &text)
                .await?;
        }
        Ok(())
    }

    async fn read_head_text_shadow(&self, path: &str) -> JcfResult<String> {
        let key = format!("{HEAD_TEXT_PREFIX}{}", path_key(&*self.hasher, path));
        match self.storage.read(&key).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(_) => Ok(String::new()),
        }
    }

    async fn refresh_head_text_shadow(&self, changes: &[FileChange]) -> JcfResult<()> {
        for change in changes {
            let path = match change {
                FileChange::Added { path, .. } | FileChange::Modified { path, .. } => path,
                _ => continue,
            };
            let key = format!("{HEAD_TEXT_PREFIX}{}", path_key(&*self.hasher, path));
            if let Ok(content) = self.storage.read(&format!("content/{path}")).await {
                self.storage.write(&key, &content).await?;
            }
        }
        Ok(())
    }

    async fn list_content_recursive(&self) -> JcfResult<Vec<String>> {
        let mut results = Vec::new();
        let mut queue = vec![String::from("content")];
        while let Some(dir) = queue.pop() {
            let entries = self.storage.list(&dir).await?;
            for name in entries {
                let full = format!("{dir}/{name}");
                let children = self.storage.list(&full).await.unwrap_or_default();
                if !children.is_empty() {
                    queue.push(full);
                } else if self.storage.exists(&full).await? {
                    results.push(
                        full.strip_prefix("content/")
                            .unwrap_or(&full)
                            .to_string(),
                    );
                }
            }
        }
        Ok(results)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn count_changes(changes: &[FileChange]) -> (usize, usize, usize, usize) {
    let mut added = 0;
    let mut modified = 0;
    let mut deleted = 0;
    let mut renamed = 0;
    for change in changes {
        match change {
            FileChange::Added { .. } => added += 1,
            FileChange::Modified { .. } => modified += 1,
            FileChange::Deleted { .. } => deleted += 1,
            FileChange::Renamed { .. } => renamed += 1,
        }
    }
    (added, modified, deleted, renamed)
}
