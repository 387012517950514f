//! # Infrastructure Layer
//!
//! Concrete implementations of port interfaces.

pub mod aes_encryptor;
pub mod archive_codec;
pub mod blob_store;
pub mod delta_store;
pub mod memory_storage;
pub mod sha256_hasher;
pub mod unified_diff;

pub use aes_encryptor::AesGcmEncryptor;
pub use archive_codec::ArchiveCodec;
pub use blob_store::BlobStore;
pub use delta_store::DeltaStore;
pub use memory_storage::MemoryStorage;
pub use sha256_hasher::Sha256Hasher;
pub use unified_diff::UnifiedDiff;
