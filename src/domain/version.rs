use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: String,

    #[serde(rename = "parentId")]
    pub parent_id: Option<String>,

    pub timestamp: String,
    pub message: String,
    pub author: String,

    #[serde(rename = "fileStates")]
    pub file_states: HashMap<String, FileState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileState {
    #[serde(rename = "inodeId")]
    pub inode_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(rename = "contentRef", skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,

    pub size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,

    #[serde(rename = "changeType", skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,

    /// Whether the blob/delta this state points at is AES-GCM encrypted at
    /// rest. CAS keys are always computed on plaintext, so this never
    /// affects `hash`/`contentRef` addressing, only how the bytes at that
    /// address must be decrypted before use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
}

impl FileState {
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
}
