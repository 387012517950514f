//! Container Verification
//!
//! Two layers: `verify_container_bytes` checks the raw archive shape
//! (mimetype framing) before a manifest even exists in memory; `verify`
//! checks the in-memory manifest against the backing store (blobs, deltas,
//! version chain). Both are read-only and hold no engine lock themselves —
//! callers under the façade take the shared lock per §5.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::manifest::Manifest;
use crate::domain::version_graph::VersionGraph;
use crate::error::{JcfError, JcfResult};
use crate::infrastructure::archive_codec::{ArchiveCodec, MIMETYPE_CONTENTS, MIMETYPE_ENTRY};
use crate::infrastructure::delta_store::{path_key, DeltaStore};
use crate::ports::{HasherPort, StoragePort};

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VerifyReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl VerifyReport {
    fn fail(&mut self, msg: impl Into<String>) {
        self.ok = false;
        self.errors.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Checks 1+2 of §4.11: mimetype framing and manifest parse/schema, run
/// against raw archive bytes before anything is loaded into a `Manifest`.
pub fn verify_container_bytes(bytes: &[u8]) -> JcfResult<(VerifyReport, Option<Manifest>)> {
    let mut report = VerifyReport {
        ok: true,
        ..Default::default()
    };

    let codec = ArchiveCodec::new();
    let entries = match codec.decode(bytes) {
        Ok(entries) => entries,
        Err(e) => {
            report.fail(format!("{e}"));
            return Ok((report, None));
        }
    };

    match entries.iter().find(|(name, _)| name == MIMETYPE_ENTRY) {
        Some((_, data)) if data.as_slice() == MIMETYPE_CONTENTS => {}
        Some(_) => report.fail("mimetype payload does not match expected literal"),
        None => report.fail("missing mimetype entry"),
    }

    let manifest_bytes = entries
        .iter()
        .find(|(name, _)| name == "manifest.json")
        .map(|(_, data)| data.clone());

    let manifest = match manifest_bytes {
        Some(bytes) => match Manifest::from_canonical_bytes(&bytes) {
            Ok(m) => Some(m),
            Err(e) => {
                report.fail(format!("{e}"));
                None
            }
        },
        None => {
            report.fail("missing manifest.json entry");
            None
        }
    };

    Ok((report, manifest))
}

pub struct VerifyUseCase<S, H> {
    storage: Arc<S>,
    hasher: Arc<H>,
    delta_store: DeltaStore<S>,
    max_file_size_bytes: u64,
    max_history_depth: usize,
}

impl<S: StoragePort, H: HasherPort> VerifyUseCase<S, H> {
    pub fn new(storage: Arc<S>, hasher: Arc<H>) -> Self {
        let delta_store = DeltaStore::new(storage.clone());
        Self {
            storage,
            hasher,
            delta_store,
            max_file_size_bytes: 500 * 1024 * 1024,
            max_history_depth: 10_000,
        }
    }

    pub fn with_limits(mut self, max_file_size_bytes: u64, max_history_depth: usize) -> Self {
        self.max_file_size_bytes = max_file_size_bytes;
        self.max_history_depth = max_history_depth;
        self
    }

    pub async fn verify(&self, manifest: &Manifest) -> JcfResult<VerifyReport> {
        let mut report = VerifyReport {
            ok: true,
            ..Default::default()
        };

        if let Err(e) = manifest.check_compatible() {
            report.fail(format!("{e}"));
        }

        let graph = match VersionGraph::build(&manifest.version_history) {
            Ok(g) => Some(g),
            Err(e) => {
                report.fail(format!("{e}"));
                None
            }
        };

        match manifest.head() {
            Some(head) => {
                if manifest.version(head).is_none() {
                    report.fail(format!("refs.head points at unknown version {head}"));
                }
            }
            None if !manifest.version_history.is_empty() => {
                report.fail("refs.head is unset but version history is non-empty");
            }
            None => {}
        }

        if let Some(graph) = &graph {
            for version in &manifest.version_history {
                if let Some(parent) = &version.parent_id {
                    if manifest.version(parent).is_none() {
                        report.fail(format!(
                            "version {} has unresolvable parentId {}",
                            version.id, parent
                        ));
                    }
                }
                if graph.ancestors(&version.id).is_err() {
                    report.fail(format!("cycle detected reachable from version {}", version.id));
                }
            }
        }

        let mut used_blobs = HashSet::new();
        let mut used_deltas = HashSet::new();

        for version in &manifest.version_history {
            for (path, state) in &version.file_states {
                if state.is_deleted() {
                    continue;
                }
                if let Some(hash) = &state.hash {
                    used_blobs.insert(hash.clone());
                    self.check_blob(&mut report, hash).await;
                }
                if let Some(content_ref) = &state.content_ref {
                    used_deltas.insert(content_ref.clone());
                    let has_delta = self.storage.exists(content_ref).await.unwrap_or(false);
                    if !has_delta {
                        // A patch larger than half the new text takes the
                        // snapshot branch instead (see §4.4); contentRef
                        // still points at the delta key it would have used.
                        let key = path_key(&*self.hasher, path);
                        let has_snapshot = self
                            .delta_store
                            .has_snapshot(&version.id, &key)
                            .await
                            .unwrap_or(false);
                        if !has_snapshot {
                            report.fail(format!("missing delta {content_ref} referenced by {path}"));
                        }
                    }
                }
                if state.size > self.max_file_size_bytes {
                    report.warn(format!(
                        "{path} at version {} is {} bytes, exceeds configured limit of {}",
                        version.id, state.size, self.max_file_size_bytes
                    ));
                }
            }
        }

        self.check_orphans(&mut report, &used_blobs, &used_deltas)
            .await;

        if manifest.version_history.len() > self.max_history_depth {
            report.warn(format!(
                "history depth {} exceeds configured threshold {}",
                manifest.version_history.len(),
                self.max_history_depth
            ));
        }

        Ok(report)
    }

    async fn check_blob(&self, report: &mut VerifyReport, hash: &str) {
        let key = format!(".store/blobs/{hash}");
        match self.storage.read(&key).await {
            Ok(bytes) => {
                let actual = self.hasher.hash(&bytes);
                if actual != hash {
                    report.fail(format!("blob {hash} rehashes to {actual}"));
                }
            }
            Err(_) => report.fail(format!("missing blob {hash}")),
        }
    }

    async fn check_orphans(
        &self,
        report: &mut VerifyReport,
        used_blobs: &HashSet<String>,
        used_deltas: &HashSet<String>,
    ) {
        if let Ok(blobs) = self.storage.list(".store/blobs").await {
            for hex in blobs {
                if !used_blobs.contains(&hex) {
                    report.warn(format!("orphan blob {hex}"));
                }
            }
        }
        if let Ok(deltas) = self.storage.list(".store/deltas").await {
            for name in deltas {
                let key = format!(".store/deltas/{name}");
                if !used_deltas.contains(&key) {
                    report.warn(format!("orphan delta {name}"));
                }
            }
        }
    }
}

/// Surfaced separately from `VerifyReport` for callers that want a hard
/// `Err` rather than a report to inspect; the façade uses this for a
/// strict `verify()` call, while tooling that wants the full warning list
/// should call `VerifyUseCase::verify` directly.
pub fn require_clean(report: &VerifyReport) -> JcfResult<()> {
    if report.ok {
        Ok(())
    } else {
        Err(JcfError::ManifestCorruption(report.errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::ProjectMetadata;
    use crate::domain::version::{ChangeType, FileState, Version};
    use crate::infrastructure::{MemoryStorage, Sha256Hasher};
    use std::collections::HashMap as Map;

    fn base_manifest() -> Manifest {
        Manifest::new(
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
        )
    }

    #[tokio::test]
    async fn clean_manifest_with_valid_blob_passes() {
        let storage = Arc::new(MemoryStorage::new());
        let hasher = Arc::new(Sha256Hasher::new());
        let hash = hasher.hash(b"hello");
        storage
            .write(&format!(".store/blobs/{hash}"), b"hello")
            .await
            .unwrap();

        let mut manifest = base_manifest();
        let mut states = Map::new();
        states.insert(
            "a.bin".to_string(),
            FileState {
                inode_id: "i1".to_string(),
                hash: Some(hash),
                content_ref: None,
                size: 5,
                deleted: None,
                change_type: Some(ChangeType::Added),
                encrypted: None,
            },
        );
        manifest.version_history.push(Version {
            id: "v1".to_string(),
            parent_id: None,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message: "init".to_string(),
            author: "tester".to_string(),
            file_states: states,
            tags: None,
            extra: None,
        });
        manifest.refs.insert("head".to_string(), "v1".to_string());

        let uc = VerifyUseCase::new(storage, hasher);
        let report = uc.verify(&manifest).await.unwrap();
        assert!(report.ok, "errors: {:?}", report.errors);
    }

    #[tokio::test]
    async fn missing_blob_is_reported() {
        let storage = Arc::new(MemoryStorage::new());
        let hasher = Arc::new(Sha256Hasher::new());

        let mut manifest = base_manifest();
        let mut states = Map::new();
        states.insert(
            "a.bin".to_string(),
            FileState {
                inode_id: "i1".to_string(),
                hash: Some("deadbeef".repeat(8)),
                content_ref: None,
                size: 5,
                deleted: None,
                change_type: Some(ChangeType::Added),
                encrypted: None,
            },
        );
        manifest.version_history.push(Version {
            id: "v1".to_string(),
            parent_id: None,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message: "init".to_string(),
            author: "tester".to_string(),
            file_states: states,
            tags: None,
            extra: None,
        });
        manifest.refs.insert("head".to_string(), "v1".to_string());

        let uc = VerifyUseCase::new(storage, hasher);
        let report = uc.verify(&manifest).await.unwrap();
        assert!(!report.ok);
        assert!(report.errors.iter().any(|e| e.contains("missing blob")));
    }

    #[tokio::test]
    async fn orphan_blob_is_a_warning_not_a_failure() {
        let storage = Arc::new(MemoryStorage::new());
        let hasher = Arc::new(Sha256Hasher::new());
        storage
            .write(".store/blobs/orphanhash", b"unused")
            .await
            .unwrap();

        let manifest = base_manifest();
        let uc = VerifyUseCase::new(storage, hasher);
        let report = uc.verify(&manifest).await.unwrap();
        assert!(report.ok);
        assert!(report.warnings.iter().any(|w| w.contains("orphan blob")));
    }

    #[tokio::test]
    async fn broken_parent_chain_fails() {
        let storage = Arc::new(MemoryStorage::new());
        let hasher = Arc::new(Sha256Hasher::new());

        let mut manifest = base_manifest();
        manifest.version_history.push(Version {
            id: "v2".to_string(),
            parent_id: Some("ghost".to_string()),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message: "x".to_string(),
            author: "tester".to_string(),
            file_states: Map::new(),
            tags: None,
            extra: None,
        });
        manifest.refs.insert("head".to_string(), "v2".to_string());

        let uc = VerifyUseCase::new(storage, hasher);
        let report = uc.verify(&manifest).await.unwrap();
        assert!(!report.ok);
    }

    #[tokio::test]
    async fn content_ref_satisfied_by_snapshot_does_not_fail() {
        let storage = Arc::new(MemoryStorage::new());
        let hasher = Arc::new(Sha256Hasher::new());
        let key = crate::infrastructure::delta_store::path_key(&*hasher, "a.txt");
        let delta_store = crate::infrastructure::delta_store::DeltaStore::new(storage.clone());
        delta_store
            .put_snapshot("v1", &key, "old full text")
            .await
            .unwrap();
        let content_ref =
            crate::infrastructure::delta_store::DeltaStore::<MemoryStorage>::delta_key("v1", &key);

        let mut manifest = base_manifest();
        let mut states = Map::new();
        states.insert(
            "a.txt".to_string(),
            FileState {
                inode_id: "i1".to_string(),
                hash: None,
                content_ref: Some(content_ref),
                size: 5,
                deleted: None,
                change_type: Some(ChangeType::Modified),
                encrypted: None,
            },
        );
        manifest.version_history.push(Version {
            id: "v1".to_string(),
            parent_id: None,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message: "snapshot instead of delta".to_string(),
            author: "tester".to_string(),
            file_states: states,
            tags: None,
            extra: None,
        });
        manifest.refs.insert("head".to_string(), "v1".to_string());

        let uc = VerifyUseCase::new(storage, hasher);
        let report = uc.verify(&manifest).await.unwrap();
        assert!(report.ok, "errors: {:?}", report.errors);
    }

    #[test]
    fn container_bytes_reject_missing_mimetype() {
        let codec = ArchiveCodec::new();
        let bytes = codec
            .encode(&[
                (MIMETYPE_ENTRY.to_string(), MIMETYPE_CONTENTS.to_vec()),
                ("manifest.json".to_string(), b"not json".to_vec()),
            ])
            .unwrap();
        let (report, manifest) = verify_container_bytes(&bytes).unwrap();
        assert!(!report.ok);
        assert!(manifest.is_none());
    }
}
