//! Content-addressed blob store built on top of a `StoragePort`.
//!
//! Keys live under `.store/blobs/<64-hex>`. Writes are idempotent by hash:
//! `put` hashes first, and skips the write entirely if the hash already
//! exists. This is what gives §8's dedup-idempotence invariant its teeth.

use std::sync::Arc;

use crate::error::{JcfError, JcfResult};
use crate::ports::{HasherPort, StoragePort};

const BLOB_PREFIX: &str = ".store/blobs/";
const TMP_PREFIX: &str = ".store/tmp/";

pub struct BlobStore<S, H> {
    storage: Arc<S>,
    hasher: Arc<H>,
    max_blob_size: u64,
}

impl<S: StoragePort, H: HasherPort> BlobStore<S, H> {
    pub fn new(storage: Arc<S>, hasher: Arc<H>, max_blob_size: u64) -> Self {
        Self {
            storage,
            hasher,
            max_blob_size,
        }
    }

    fn key(hex: &str) -> String {
        format!("{BLOB_PREFIX}{hex}")
    }

    fn validate_hex(hex: &str) -> JcfResult<()> {
        let valid = hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit());
        if valid {
            Ok(())
        } else {
            Err(JcfError::Validation(format!("invalid blob hash: {hex}")))
        }
    }

    /// Idempotent by content hash: writing the same bytes twice is a no-op
    /// the second time. Returns the hex digest the content is addressed by.
    pub async fn put(&self, bytes: &[u8]) -> JcfResult<String> {
        if bytes.len() as u64 > self.max_blob_size {
            return Err(JcfError::BlobTooLarge {
                size: bytes.len() as u64,
                limit: self.max_blob_size,
            });
        }
        let hex = self.hasher.hash(bytes);
        if self.has(&hex).await? {
            return Ok(hex);
        }
        // Tee-write pattern per the container contract: stage under a
        // temp name, then rename into place only once we know the hash.
        // Here the hash is already known up-front (no streaming reader in
        // this code path), so the temp stage mainly buys atomicity of the
        // final placement via StoragePort::rename.
        let tmp_key = format!("{TMP_PREFIX}{}", uuid::Uuid::new_v4());
        self.storage
            .write(&tmp_key, bytes)
            .await
            .map_err(JcfError::from)?;
        let final_key = Self::key(&hex);
        match self.storage.rename(&tmp_key, &final_key).await {
            Ok(()) => Ok(hex),
            Err(e) => {
                let _ = self.storage.delete(&tmp_key).await;
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, hex: &str) -> JcfResult<Vec<u8>> {
        Self::validate_hex(hex)?;
        let bytes = self
            .storage
            .read(&Self::key(hex))
            .await
            .map_err(|_| JcfError::MissingBlob(hex.to_string()))?;
        let actual = self.hasher.hash(&bytes);
        if actual != hex {
            return Err(JcfError::BlobCorruption {
                hash: hex.to_string(),
                reason: format!("stored bytes hash to {actual}"),
            });
        }
        Ok(bytes)
    }

    pub async fn has(&self, hex: &str) -> JcfResult<bool> {
        Self::validate_hex(hex)?;
        Ok(self.storage.exists(&Self::key(hex)).await?)
    }

    pub async fn delete(&self, hex: &str) -> JcfResult<()> {
        Self::validate_hex(hex)?;
        Ok(self.storage.delete(&Self::key(hex)).await?)
    }

    pub async fn list(&self) -> JcfResult<Vec<String>> {
        Ok(self.storage.list(".store/blobs").await?)
    }

    /// Hash and size for a stored blob, without reading the full content
    /// into a caller-facing buffer twice. Used by listing/inspection
    /// callers that only need the value type, not the bytes.
    pub async fn stat(&self, hex: &str) -> JcfResult<crate::domain::blob::Blob> {
        Self::validate_hex(hex)?;
        let size = self.storage.size(&Self::key(hex)).await?;
        Ok(crate::domain::blob::Blob::new(hex.to_string(), size as u64))
    }
}
