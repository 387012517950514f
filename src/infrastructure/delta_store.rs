//! Delta (reverse-patch) and snapshot storage.
//!
//! Key format: `.store/deltas/<childVersionId>_<pathKey>.patch`, where
//! `pathKey` is the first 16 hex chars of `sha256(path)`. Snapshots live
//! under `.store/snapshots/<versionId>/<pathKey>` and hold full text, used
//! when a patch would be larger than the snapshot or on a periodic cadence.

use std::sync::Arc;

use crate::error::JcfResult;
use crate::ports::{HasherPort, StoragePort};

const DELTA_PREFIX: &str = ".store/deltas/";
const SNAPSHOT_PREFIX: &str = ".store/snapshots/";
const PATH_KEY_LEN: usize = 16;

pub fn path_key<H: HasherPort + ?Sized>(hasher: &H, path: &str) -> String {
    let full = hasher.hash(path.as_bytes());
    full.chars().take(PATH_KEY_LEN).collect()
}

pub struct DeltaStore<S> {
    storage: Arc<S>,
}

impl<S: StoragePort> DeltaStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn delta_key(version_id: &str, path_key: &str) -> String {
        format!("{DELTA_PREFIX}{version_id}_{path_key}.patch")
    }

    pub fn snapshot_key(version_id: &str, path_key: &str) -> String {
        format!("{SNAPSHOT_PREFIX}{version_id}/{path_key}")
    }

    pub async fn put_delta(&self, version_id: &str, path_key: &str, patch: &str) -> JcfResult<()> {
        let key = Self::delta_key(version_id, path_key);
        Ok(self.storage.write(&key, patch.as_bytes()).await?)
    }

    pub async fn get_delta(&self, version_id: &str, path_key: &str) -> JcfResult<String> {
        let key = Self::delta_key(version_id, path_key);
        let bytes = self.storage.read(&key).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn has_delta(&self, version_id: &str, path_key: &str) -> JcfResult<bool> {
        Ok(self
            .storage
            .exists(&Self::delta_key(version_id, path_key))
            .await?)
    }

    pub async fn put_snapshot(
        &self,
        version_id: &str,
        path_key: &str,
        text: &str,
    ) -> JcfResult<()> {
        let key = Self::snapshot_key(version_id, path_key);
        Ok(self.storage.write(&key, text.as_bytes()).await?)
    }

    pub async fn get_snapshot(&self, version_id: &str, path_key: &str) -> JcfResult<String> {
        let key = Self::snapshot_key(version_id, path_key);
        let bytes = self.storage.read(&key).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn has_snapshot(&self, version_id: &str, path_key: &str) -> JcfResult<bool> {
        Ok(self
            .storage
            .exists(&Self::snapshot_key(version_id, path_key))
            .await?)
    }

    pub async fn list_deltas(&self) -> JcfResult<Vec<String>> {
        Ok(self.storage.list(".store/deltas").await?)
    }

    pub async fn list_snapshots(&self) -> JcfResult<Vec<String>> {
        Ok(self.storage.list(".store/snapshots").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{MemoryStorage, Sha256Hasher};

    #[test]
    fn path_key_is_16_hex_chars() {
        let hasher = Sha256Hasher::new();
        let key = path_key(&hasher, "content/foo.txt");
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn path_key_is_deterministic() {
        let hasher = Sha256Hasher::new();
        assert_eq!(
            path_key(&hasher, "content/foo.txt"),
            path_key(&hasher, "content/foo.txt")
        );
    }

    #[tokio::test]
    async fn delta_roundtrips() {
        let store = DeltaStore::new(Arc::new(MemoryStorage::new()));
        store.put_delta("v2", "abc123", "--- patch ---").await.unwrap();
        assert!(store.has_delta("v2", "abc123").await.unwrap());
        assert_eq!(
            store.get_delta("v2", "abc123").await.unwrap(),
            "--- patch ---"
        );
    }

    #[tokio::test]
    async fn snapshot_roundtrips() {
        let store = DeltaStore::new(Arc::new(MemoryStorage::new()));
        store
            .put_snapshot("v7", "def456", "full text contents")
            .await
            .unwrap();
        assert!(store.has_snapshot("v7", "def456").await.unwrap());
        assert_eq!(
            store.get_snapshot("v7", "def456").await.unwrap(),
            "full text contents"
        );
    }
}
