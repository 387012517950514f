//! # Ports Layer
//!
//! Defines interfaces (traits) for external adapters. These ports abstract
//! away storage, diffing, hashing, compression and encryption so the
//! application layer never depends on a concrete backend.

use async_trait::async_trait;

/// Error types for port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("patch application failed: {0}")]
    PatchFailed(String),

    #[error("compression error: {0}")]
    CompressionError(String),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("blob too large: {size} bytes exceeds limit of {limit} bytes")]
    BlobTooLarge { size: u64, limit: u64 },

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type PortResult<T> = std::result::Result<T, PortError>;

/// Storage Port: abstraction for the underlying byte store the engine reads
/// and writes archive entries through.
///
/// Implementations:
/// - `MemoryStorage` (tests, in-process containers)
/// - a filesystem-backed adapter for on-disk `.jcf` containers
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Read file contents (for small files, below the streaming threshold).
    async fn read(&self, path: &str) -> PortResult<Vec<u8>>;

    /// Write data to file (creates parent dirs if needed).
    async fn write(&self, path: &str, data: &[u8]) -> PortResult<()>;

    /// Delete a file.
    async fn delete(&self, path: &str) -> PortResult<()>;

    /// Check if file exists.
    async fn exists(&self, path: &str) -> PortResult<bool>;

    /// List files in directory.
    async fn list(&self, dir: &str) -> PortResult<Vec<String>>;

    /// Get file size in bytes.
    async fn size(&self, path: &str) -> PortResult<usize>;

    /// Move/rename a file within the store. Used by `moveFile` to keep an
    /// inode's storage key stable across path renames where the backend
    /// supports an atomic move; default falls back to copy + delete.
    async fn rename(&self, from: &str, to: &str) -> PortResult<()> {
        let data = self.read(from).await?;
        self.write(to, &data).await?;
        self.delete(from).await
    }

    // =========================================================================
    // STREAMING METHODS (for large files)
    // =========================================================================

    /// Read file in chunks (streaming).
    ///
    /// Default implementation falls back to `read()`.
    async fn read_chunked(&self, path: &str, chunk_size: usize) -> PortResult<Vec<Vec<u8>>> {
        let data = self.read(path).await?;
        Ok(data.chunks(chunk_size).map(|c| c.to_vec()).collect())
    }

    /// Write file from chunks (streaming).
    ///
    /// Default implementation buffers all chunks and calls `write()`.
    async fn write_chunked(&self, path: &str, chunks: Vec<Vec<u8>>) -> PortResult<()> {
        let data: Vec<u8> = chunks.into_iter().flatten().collect();
        self.write(path, &data).await
    }
}

#[async_trait]
impl<S: StoragePort + ?Sized> StoragePort for std::sync::Arc<S> {
    async fn read(&self, path: &str) -> PortResult<Vec<u8>> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, data: &[u8]) -> PortResult<()> {
        (**self).write(path, data).await
    }

    async fn delete(&self, path: &str) -> PortResult<()> {
        (**self).delete(path).await
    }

    async fn exists(&self, path: &str) -> PortResult<bool> {
        (**self).exists(path).await
    }

    async fn list(&self, dir: &str) -> PortResult<Vec<String>> {
        (**self).list(dir).await
    }

    async fn size(&self, path: &str) -> PortResult<usize> {
        (**self).size(path).await
    }

    async fn rename(&self, from: &str, to: &str) -> PortResult<()> {
        (**self).rename(from, to).await
    }

    async fn read_chunked(&self, path: &str, chunk_size: usize) -> PortResult<Vec<Vec<u8>>> {
        (**self).read_chunked(path, chunk_size).await
    }

    async fn write_chunked(&self, path: &str, chunks: Vec<Vec<u8>>) -> PortResult<()> {
        (**self).write_chunked(path, chunks).await
    }
}

/// Diff Port: text diffing and patching, using unified diff format.
pub trait DiffPort: Send + Sync {
    /// Compute a unified diff transforming `old` into `new`.
    fn compute_diff(&self, old: &str, new: &str) -> String;

    /// Apply a unified diff patch exactly. Fails if any hunk's context
    /// doesn't match the input text verbatim.
    fn apply_patch(&self, text: &str, patch: &str) -> PortResult<String>;

    /// Apply a unified diff patch allowing hunks to shift within a small
    /// line-offset window when exact context matching fails. This is the
    /// second tier of the three-tier patch-application escalation; callers
    /// fall back to a full snapshot when even this fails.
    fn apply_patch_fuzzy(&self, text: &str, patch: &str) -> PortResult<String>;
}

/// Hasher Port: content hashing for content-addressed storage.
pub trait HasherPort: Send + Sync {
    /// Compute the content hash of `data`. Returns a lowercase hex string.
    fn hash(&self, data: &[u8]) -> String;

    /// Compute hash incrementally from a stream (for large files).
    fn hash_stream(&self, reader: &mut dyn std::io::Read) -> PortResult<String>;
}

/// Compressor Port: archive-entry compression/decompression.
#[async_trait]
pub trait CompressorPort: Send + Sync {
    /// Compress data with specified level (0-9).
    async fn compress(&self, data: &[u8], level: u32) -> PortResult<Vec<u8>>;

    /// Decompress data.
    async fn decompress(&self, data: &[u8]) -> PortResult<Vec<u8>>;
}

/// Encryption Port: authenticated encryption for data at rest.
///
/// Keys are derived from user-provided passphrases via PBKDF2.
#[async_trait]
pub trait EncryptionPort: Send + Sync {
    /// Encrypt data with the provided key.
    ///
    /// Returns ciphertext with nonce prepended (nonce || ciphertext || tag).
    async fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> PortResult<Vec<u8>>;

    /// Decrypt data with the provided key.
    ///
    /// Expects nonce || ciphertext || tag format.
    async fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> PortResult<Vec<u8>>;

    /// Derive a 256-bit key from a passphrase using PBKDF2.
    fn derive_key(&self, passphrase: &str, salt: &[u8]) -> PortResult<Vec<u8>>;
}

pub use PortError as Error;

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe<T: StoragePort + ?Sized>() {}
    fn _assert_diff_object_safe<T: DiffPort + ?Sized>() {}
}
