//! # Restore Version Use Case
//!
//! Restores the working directory to a specific version. Text files are
//! rebuilt by walking reverse patches from HEAD down to the target; binary
//! files are fetched directly from CAS. Patch application escalates
//! exact → fuzzy → snapshot before giving up.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::application::save_checkpoint::HEAD_TEXT_PREFIX;
use crate::domain::manifest::{FileType, Manifest};
use crate::domain::normalize::normalize_text;
use crate::domain::version::{ChangeType, FileState};
use crate::domain::version_graph::VersionGraph;
use crate::error::{JcfError, JcfResult};
use crate::infrastructure::delta_store::{path_key, DeltaStore};
use crate::infrastructure::BlobStore;
use crate::observer::{null_observer, ApplyStrategy, Observer};
use crate::ports::{DiffPort, EncryptionPort, HasherPort, StoragePort};

#[derive(Debug, Clone)]
pub struct RestoreVersionInput {
    pub target_version_id: String,
    pub force: bool,
    pub encryption_key: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct RestoreVersionOutput {
    pub restored_version_id: String,
    pub files_restored: usize,
    pub patches_applied: usize,
    pub fuzzy_applies: usize,
}

pub struct RestoreVersionUseCase<S, D, H, E> {
    storage: Arc<S>,
    diff: Arc<D>,
    hasher: Arc<H>,
    encryptor: Arc<E>,
    blob_store: BlobStore<S, H>,
    delta_store: DeltaStore<S>,
    observer: Arc<dyn Observer>,
}

impl<S, D, H, E> RestoreVersionUseCase<S, D, H, E>
where
    S: StoragePort,
    D: DiffPort,
    H: HasherPort,
    E: EncryptionPort,
{
    pub fn new(
        storage: Arc<S>,
        diff: Arc<D>,
        hasher: Arc<H>,
        encryptor: Arc<E>,
        max_blob_size: u64,
    ) -> Self {
        let blob_store = BlobStore::new(storage.clone(), hasher.clone(), max_blob_size);
        let delta_store = DeltaStore::new(storage.clone());
        Self {
            storage,
            diff,
            hasher,
            encryptor,
            blob_store,
            delta_store,
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
        input: RestoreVersionInput,
    ) -> JcfResult<RestoreVersionOutput> {
        let head_id = manifest
            .head()
            .map(str::to_string)
            .ok_or_else(|| JcfError::NotFound("HEAD".to_string()))?;

        if !input.force {
            self.assert_clean_working_copy(manifest, &head_id).await?;
        }

        let target_id = input.target_version_id.clone();
        let graph = VersionGraph::build(&manifest.version_history)?;
        let version_path = graph.path(&head_id, &target_id)?;

        let target_version = manifest
            .version(&target_id)
            .ok_or_else(|| JcfError::NotFound(target_id.clone()))?
            .clone();
        let head_files: HashMap<String, FileState> = manifest
            .version(&head_id)
            .map(|v| v.file_states.clone())
            .unwrap_or_default();

        let mut files_restored = 0;
        let mut patches_applied = 0;
        let mut fuzzy_applies = 0;

        for (path, target_state) in &target_version.file_states {
            if target_state.is_deleted() {
                continue;
            }
            let is_text = manifest
                .file_map
                .get(path)
                .map(|e| matches!(e.file_type, FileType::Text))
                .unwrap_or(false);

            if is_text {
                let (text, patches) = self
                    .reconstruct_text(manifest, path, &version_path, &target_id, &input)
                    .await?;
                patches_applied += patches.0;
                fuzzy_applies += patches.1;
                self.storage
                    .write(&format!("content/{path}"), text.as_bytes())
                    .await?;
                self.verify_post_condition(path, text.as_bytes(), target_state)?;
            } else {
                let hash = target_state
                    .hash
                    .as_ref()
                    .ok_or_else(|| JcfError::MissingBlob(path.clone()))?;
                let mut bytes = self.blob_store.get(hash).await?;
                if target_state.is_encrypted() {
                    let key = input
                        .encryption_key
                        .as_ref()
                        .ok_or_else(|| JcfError::Validation("encryption key required".into()))?;
                    bytes = self
                        .encryptor
                        .decrypt(key, &bytes)
                        .await
                        .map_err(JcfError::from)?;
                }
                self.storage.write(&format!("content/{path}"), &bytes).await?;
            }
            files_restored += 1;
            self.observer.on_event(crate::observer::Event::Write {
                path: path.clone(),
                bytes: 0,
            });
        }

        for path in head_files.keys() {
            if !target_version.file_states.contains_key(path)
                || target_version.file_states[path].is_deleted()
            {
                let key = format!("content/{path}");
                if self.storage.exists(&key).await? {
                    self.storage.delete(&key).await?;
                }
            }
        }

        manifest
            .refs
            .insert(crate::domain::manifest::HEAD_REF.to_string(), target_id.clone());

        Ok(RestoreVersionOutput {
            restored_version_id: target_id,
            files_restored,
            patches_applied,
            fuzzy_applies,
        })
    }

    async fn assert_clean_working_copy(&self, manifest: &Manifest, head_id: &str) -> JcfResult<()> {
        let head_version = manifest
            .version(head_id)
            .ok_or_else(|| JcfError::NotFound(head_id.to_string()))?;
        for (path, state) in &head_version.file_states {
            if state.is_deleted() {
                continue;
            }
            let key = format!("content/{path}");
            let exists = self.storage.exists(&key).await?;
            if !exists {
                return Err(JcfError::DirtyWorkingCopy);
            }
            let bytes = self.storage.read(&key).await?;
            let is_text = manifest
                .file_map
                .get(path)
                .map(|e| matches!(e.file_type, FileType::Text))
                .unwrap_or(false);
            if is_text {
                // Text FileStates never populate `hash` (see save_checkpoint's
                // Modified arm), so the only committed reference available is
                // the head-text shadow refreshed on the last successful
                // checkpoint.
                let current = normalize_text(&String::from_utf8_lossy(&bytes));
                let committed = normalize_text(&self.read_head_text_shadow(path).await?);
                if current != committed {
                    return Err(JcfError::DirtyWorkingCopy);
                }
            } else if let Some(expected) = &state.hash {
                if &self.hasher.hash(&bytes) != expected {
                    return Err(JcfError::DirtyWorkingCopy);
                }
            }
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

    /// Reconstruct a text path by walking `version_path` (HEAD-first) and
    /// applying each step's reverse patch, starting from the content mirror
    /// (which always equals HEAD's full text).
    async fn reconstruct_text(
        &self,
        manifest: &Manifest,
        path: &str,
        version_path: &[String],
        target_id: &str,
        input: &RestoreVersionInput,
    ) -> JcfResult<(String, (usize, usize))> {
        let mut text = {
            let bytes = self
                .storage
                .read(&format!("content/{path}"))
                .await
                .unwrap_or_default();
            normalize_text(&String::from_utf8_lossy(&bytes))
        };

        let mut exact_count = 0;
        let mut fuzzy_count = 0;
        let key = path_key(&*self.hasher, path);

        for window in version_path.windows(2) {
            let (child, _parent) = (&window[0], &window[1]);
            let child_version = manifest
                .version(child)
                .ok_or_else(|| JcfError::BrokenChain(child.clone()))?;
            let Some(state) = child_version.file_states.get(path) else {
                continue;
            };
            // Only a version that actually modified this path wrote a
            // reverse delta/snapshot for it; `build_version` clones the
            // parent's whole `fileStates` map forward, so an untouched path
            // still carries whatever `contentRef`/`hash` it had the last
            // time it *was* modified. Checking those fields for presence
            // (rather than `changeType`) would replay a stale delta that was
            // never written for this version.
            if state.change_type != Some(ChangeType::Modified) {
                continue;
            }

            if self.delta_store.has_snapshot(child, &key).await? {
                text = self.delta_store.get_snapshot(child, &key).await?;
                continue;
            }

            let mut patch = self.delta_store.get_delta(child, &key).await?;
            if state.is_encrypted() {
                let enc_key = input
                    .encryption_key
                    .as_ref()
                    .ok_or_else(|| JcfError::Validation("encryption key required".into()))?;
                let decrypted = self
                    .encryptor
                    .decrypt(enc_key, patch.as_bytes())
                    .await
                    .map_err(JcfError::from)?;
                patch = String::from_utf8_lossy(&decrypted).into_owned();
            }

            match self.diff.apply_patch(&text, &patch) {
                Ok(applied) => {
                    text = normalize_text(&applied);
                    exact_count += 1;
                    self.observer.on_event(crate::observer::Event::PatchApply {
                        path: path.to_string(),
                        strategy: ApplyStrategy::Exact,
                    });
                }
                Err(_) => match self.diff.apply_patch_fuzzy(&text, &patch) {
                    Ok(applied) => {
                        text = normalize_text(&applied);
                        fuzzy_count += 1;
                        self.observer.on_event(crate::observer::Event::PatchApply {
                            path: path.to_string(),
                            strategy: ApplyStrategy::Fuzzy,
                        });
                    }
                    Err(_) => {
                        if self.delta_store.has_snapshot(child, &key).await? {
                            text = self.delta_store.get_snapshot(child, &key).await?;
                            self.observer.on_event(crate::observer::Event::PatchApply {
                                path: path.to_string(),
                                strategy: ApplyStrategy::Snapshot,
                            });
                        } else {
                            return Err(JcfError::PatchApplicationFailed {
                                path: path.to_string(),
                                from_version: child.clone(),
                            });
                        }
                    }
                },
            }
        }

        let _ = target_id;
        Ok((text, (exact_count, fuzzy_count)))
    }

    /// `getFile(path, versionId)`: a read-only variant of reconstruction
    /// that never touches the working copy. Walks from HEAD down to
    /// `target_version_id` the same way `execute` does, but returns bytes
    /// instead of writing `content/<path>`.
    pub async fn get_file_at(
        &self,
        manifest: &Manifest,
        path: &str,
        target_version_id: &str,
        encryption_key: Option<&[u8]>,
    ) -> JcfResult<Vec<u8>> {
        let target_version = manifest
            .version(target_version_id)
            .ok_or_else(|| JcfError::NotFound(target_version_id.to_string()))?;
        let target_state = target_version
            .file_states
            .get(path)
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| JcfError::NotFound(path.to_string()))?;

        let is_text = manifest
            .file_map
            .get(path)
            .map(|e| matches!(e.file_type, FileType::Text))
            .unwrap_or(false);

        if is_text {
            let head_id = manifest
                .head()
                .map(str::to_string)
                .ok_or_else(|| JcfError::NotFound("HEAD".to_string()))?;
            let graph = VersionGraph::build(&manifest.version_history)?;
            let version_path = graph.path(&head_id, target_version_id)?;
            let input = RestoreVersionInput {
                target_version_id: target_version_id.to_string(),
                force: true,
                encryption_key: encryption_key.map(|k| k.to_vec()),
            };
            let (text, _) = self
                .reconstruct_text(manifest, path, &version_path, target_version_id, &input)
                .await?;
            Ok(text.into_bytes())
        } else {
            let hash = target_state
                .hash
                .as_ref()
                .ok_or_else(|| JcfError::MissingBlob(path.to_string()))?;
            let mut bytes = self.blob_store.get(hash).await?;
            if target_state.is_encrypted() {
                let key = encryption_key
                    .ok_or_else(|| JcfError::Validation("encryption key required".into()))?;
                bytes = self.encryptor.decrypt(key, &bytes).await.map_err(JcfError::from)?;
            }
            Ok(bytes)
        }
    }

    fn verify_post_condition(
        &self,
        path: &str,
        bytes: &[u8],
        target_state: &FileState,
    ) -> JcfResult<()> {
        if let Some(expected) = &target_state.hash {
            let actual = self.hasher.hash(bytes);
            if &actual != expected {
                return Err(JcfError::BlobCorruption {
                    hash: expected.clone(),
                    reason: format!("reconstructed {path} hashes to {actual}"),
                });
            }
        }
        Ok(())
    }
}
