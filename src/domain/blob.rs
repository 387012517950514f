//! Blob value type.
//!
//! The CAS itself (hashing, dedup, storage) lives in
//! `infrastructure::blob_store`; this is just the immutable value the store
//! hands back. GC uses mark-and-sweep over version history rather than
//! reference counting, so no `refCount` bookkeeping is carried here.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub hash: String,
    pub size: u64,
}

impl Blob {
    pub fn new(hash: String, size: u64) -> Self {
        Self { hash, size }
    }
}
