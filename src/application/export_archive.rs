//! Export Archive Use Case
//!
//! Serializes the current manifest plus everything under `content/` and
//! `.store/` into a single ZIP-shaped container, via `ArchiveCodec` so the
//! per-entry compression policy (§4.2) is applied uniformly.

use std::sync::Arc;

use crate::domain::manifest::Manifest;
use crate::error::JcfResult;
use crate::infrastructure::archive_codec::{ArchiveCodec, MIMETYPE_CONTENTS, MIMETYPE_ENTRY};
use crate::ports::StoragePort;

pub struct ExportArchiveUseCase<S> {
    storage: Arc<S>,
    codec: ArchiveCodec,
}

impl<S: StoragePort> ExportArchiveUseCase<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            codec: ArchiveCodec::new(),
        }
    }

    pub async fn execute(&self, manifest: &Manifest) -> JcfResult<Vec<u8>> {
        let mut entries = vec![
            (MIMETYPE_ENTRY.to_string(), MIMETYPE_CONTENTS.to_vec()),
            ("manifest.json".to_string(), manifest.canonicalize()?),
        ];

        for dir in [".store/blobs", ".store/deltas", ".store/snapshots", "content"] {
            for path in self.list_recursive(dir).await? {
                let data = self
                    .storage
                    .read(&path)
                    .await
                    .map_err(crate::error::JcfError::from)?;
                entries.push((path, data));
            }
        }

        self.codec.encode(&entries)
    }

    async fn list_recursive(&self, dir: &str) -> JcfResult<Vec<String>> {
        let mut results = Vec::new();
        let mut queue = vec![dir.to_string()];

        while let Some(current_dir) = queue.pop() {
            let entries = match self.storage.list(&current_dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            for entry in entries {
                let full_path = format!("{current_dir}/{entry}");
                match self.storage.list(&full_path).await {
                    Ok(children) if !children.is_empty() => queue.push(full_path),
                    _ => {
                        if self.storage.size(&full_path).await.is_ok() {
                            results.push(full_path);
                        }
                    }
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::ProjectMetadata;
    use crate::infrastructure::{ArchiveCodec as Codec, MemoryStorage};

    #[tokio::test]
    async fn export_produces_valid_container_with_manifest_first_after_mimetype() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write("content/readme.txt", b"hi").await.unwrap();

        let manifest = Manifest::new(
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

        let uc = ExportArchiveUseCase::new(storage);
        let bytes = uc.execute(&manifest).await.unwrap();

        let codec = Codec::new();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded[0].0, MIMETYPE_ENTRY);
        assert!(decoded.iter().any(|(n, _)| n == "manifest.json"));
        assert!(decoded
            .iter()
            .any(|(n, d)| n == "content/readme.txt" && d == b"hi"));
    }
}
