//! Garbage Collection Use Case
//!
//! Mark-and-sweep over `versionHistory`, with a grace window before an
//! orphaned blob/delta becomes eligible for deletion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::domain::manifest::Manifest;
use crate::error::JcfResult;
use crate::ports::StoragePort;

#[derive(Debug, Clone, Copy)]
pub struct GcInput {
    pub grace_period_secs: u64,
    pub dry_run: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GcResult {
    pub blobs_checked: usize,
    pub blobs_deleted: usize,
    pub deltas_checked: usize,
    pub deltas_deleted: usize,
    pub bytes_freed: u64,
    pub dry_run: bool,
}

pub struct GcUseCase<S> {
    storage: Arc<S>,
}

impl<S: StoragePort> GcUseCase<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    #[instrument(skip(self, manifest, now))]
    pub async fn run(&self, manifest: &Manifest, input: GcInput, now: DateTime<Utc>) -> JcfResult<GcResult> {
        let (used_blobs, used_deltas, last_referenced) = self.mark(manifest);

        let all_blobs = self.storage.list(".store/blobs").await.unwrap_or_default();
        let all_deltas = self.storage.list(".store/deltas").await.unwrap_or_default();

        let mut bytes_freed: u64 = 0;
        let mut blobs_deleted = 0;
        let mut deltas_deleted = 0;

        for hex in &all_blobs {
            if used_blobs.contains(hex) {
                continue;
            }
            let key = format!(".store/blobs/{hex}");
            if !self.within_grace(hex, &last_referenced, now, input.grace_period_secs) {
                if let Ok(size) = self.storage.size(&key).await {
                    bytes_freed += size as u64;
                }
                if !input.dry_run {
                    self.storage.delete(&key).await?;
                }
                blobs_deleted += 1;
            }
        }

        for delta_name in &all_deltas {
            if used_deltas.contains(delta_name) {
                continue;
            }
            let key = format!(".store/deltas/{delta_name}");
            if !self.within_grace(delta_name, &last_referenced, now, input.grace_period_secs) {
                if let Ok(size) = self.storage.size(&key).await {
                    bytes_freed += size as u64;
                }
                if !input.dry_run {
                    self.storage.delete(&key).await?;
                }
                deltas_deleted += 1;
            }
        }

        Ok(GcResult {
            blobs_checked: all_blobs.len(),
            blobs_deleted,
            deltas_checked: all_deltas.len(),
            deltas_deleted,
            bytes_freed,
            dry_run: input.dry_run,
        })
    }

    /// Mark every blob hash and delta key referenced by any non-deleted
    /// `FileState`, plus the version timestamp that most recently referenced
    /// each key (used for the grace-period filter on orphans).
    fn mark(&self, manifest: &Manifest) -> (HashSet<String>, HashSet<String>, HashMap<String, DateTime<Utc>>) {
        let mut used_blobs = HashSet::new();
        let mut used_deltas = HashSet::new();
        let mut last_referenced: HashMap<String, DateTime<Utc>> = HashMap::new();

        for version in &manifest.version_history {
            let ts: DateTime<Utc> = version
                .timestamp
                .parse()
                .unwrap_or_else(|_| DateTime::<Utc>::from_timestamp(0, 0).unwrap());
            for state in version.file_states.values() {
                if let Some(hash) = &state.hash {
                    used_blobs.insert(hash.clone());
                    let entry = last_referenced.entry(hash.clone()).or_insert(ts);
                    if ts > *entry {
                        *entry = ts;
                    }
                }
                if let Some(content_ref) = &state.content_ref {
                    if let Some(key) = content_ref.strip_prefix(".store/deltas/") {
                        used_deltas.insert(key.to_string());
                        let entry = last_referenced.entry(key.to_string()).or_insert(ts);
                        if ts > *entry {
                            *entry = ts;
                        }
                    }
                }
            }
        }

        (used_blobs, used_deltas, last_referenced)
    }

    fn within_grace(
        &self,
        key: &str,
        last_referenced: &HashMap<String, DateTime<Utc>>,
        now: DateTime<Utc>,
        grace_secs: u64,
    ) -> bool {
        let since = last_referenced
            .get(key)
            .copied()
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        let age = (now - since).num_seconds().max(0) as u64;
        age < grace_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::ProjectMetadata;
    use crate::domain::version::{ChangeType, FileState, Version};
    use crate::infrastructure::MemoryStorage;
    use std::collections::HashMap as Map;

    fn manifest_with_one_referenced_blob() -> Manifest {
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
        let mut states = Map::new();
        states.insert(
            "file1.bin".to_string(),
            FileState {
                inode_id: "i1".to_string(),
                hash: Some("hash1".to_string()),
                content_ref: None,
                size: 8,
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
        manifest
    }

    #[tokio::test]
    async fn gc_removes_orphan_past_grace_period() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(".store/blobs/hash1", b"content1").await.unwrap();
        storage.write(".store/blobs/orphan", b"orphan").await.unwrap();

        let manifest = manifest_with_one_referenced_blob();
        let gc = GcUseCase::new(storage.clone());
        let result = gc
            .run(
                &manifest,
                GcInput {
                    grace_period_secs: 0,
                    dry_run: false,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(result.blobs_deleted, 1);
        assert!(storage.exists(".store/blobs/hash1").await.unwrap());
        assert!(!storage.exists(".store/blobs/orphan").await.unwrap());
    }

    #[tokio::test]
    async fn dry_run_reports_without_deleting() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(".store/blobs/hash1", b"content1").await.unwrap();
        storage.write(".store/blobs/orphan", b"orphan").await.unwrap();

        let manifest = manifest_with_one_referenced_blob();
        let gc = GcUseCase::new(storage.clone());
        let result = gc
            .run(
                &manifest,
                GcInput {
                    grace_period_secs: 0,
                    dry_run: true,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(result.blobs_deleted, 1);
        assert!(storage.exists(".store/blobs/orphan").await.unwrap());
    }

    #[tokio::test]
    async fn recent_orphan_kept_within_grace_window() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(".store/blobs/hash1", b"content1").await.unwrap();
        storage.write(".store/blobs/orphan", b"orphan").await.unwrap();

        let manifest = manifest_with_one_referenced_blob();
        let gc = GcUseCase::new(storage.clone());
        let result = gc
            .run(
                &manifest,
                GcInput {
                    grace_period_secs: 7 * 24 * 60 * 60,
                    dry_run: false,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(result.blobs_deleted, 0);
        assert!(storage.exists(".store/blobs/orphan").await.unwrap());
    }
}
