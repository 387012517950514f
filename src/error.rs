//! Unified error taxonomy for the engine.
//!
//! `ports::PortError` covers adapter-level failures; `JcfError` widens that
//! into the full set of outcomes an application-layer operation can report,
//! matching the kinds a caller needs to branch on (dirty working copy vs.
//! corruption vs. "nothing to do").

use thiserror::Error;

use crate::ports::PortError;

#[derive(Debug, Error)]
pub enum JcfError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid container: {0}")]
    InvalidContainer(String),

    #[error("manifest corruption: {0}")]
    ManifestCorruption(String),

    #[error("broken version chain: {0}")]
    BrokenChain(String),

    #[error("missing blob: {0}")]
    MissingBlob(String),

    #[error("blob corruption for {hash}: {reason}")]
    BlobCorruption { hash: String, reason: String },

    #[error("missing delta: {0}")]
    MissingDelta(String),

    #[error("patch synthesis failed for {path}: {reason}")]
    PatchSynthesisFailed { path: String, reason: String },

    #[error("patch application failed for {path} from version {from_version}")]
    PatchApplicationFailed { path: String, from_version: String },

    #[error("working copy has uncommitted changes")]
    DirtyWorkingCopy,

    #[error("no changes to commit")]
    NoChanges,

    #[error("version {to} is not reachable from {from}")]
    UnreachableVersion { from: String, to: String },

    #[error("blob too large: {size} bytes exceeds limit of {limit} bytes")]
    BlobTooLarge { size: u64, limit: u64 },

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("concurrent modification detected: {0}")]
    ConcurrentModification(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type JcfResult<T> = std::result::Result<T, JcfError>;

impl From<PortError> for JcfError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Io(e) => JcfError::Io(e),
            PortError::NotFound(p) => JcfError::NotFound(p),
            PortError::AlreadyExists(p) => JcfError::AlreadyExists(p),
            PortError::Quota(m) => JcfError::Quota(m),
            PortError::InvalidHash(h) => JcfError::Validation(format!("invalid hash: {h}")),
            PortError::BlobTooLarge { size, limit } => JcfError::BlobTooLarge { size, limit },
            PortError::PatchFailed(m) => JcfError::PatchApplicationFailed {
                path: String::new(),
                from_version: m,
            },
            PortError::CompressionError(m) => JcfError::InvalidContainer(m),
            PortError::EncryptionError(m) => JcfError::Validation(format!("encryption error: {m}")),
            PortError::Cancelled => JcfError::Cancelled,
        }
    }
}

impl JcfError {
    /// CLI exit-code mapping, illustrative per the engine's external contract.
    /// This crate does not ship a CLI; callers building one can use this table.
    pub fn exit_code(&self) -> i32 {
        match self {
            JcfError::NotFound(_) | JcfError::MissingBlob(_) | JcfError::MissingDelta(_) => 3,
            JcfError::UnreachableVersion { .. } => 4,
            JcfError::ManifestCorruption(_)
            | JcfError::BrokenChain(_)
            | JcfError::BlobCorruption { .. }
            | JcfError::InvalidContainer(_) => 5,
            JcfError::Validation(_) | JcfError::AlreadyExists(_) => 2,
            _ => 1,
        }
    }
}
