//! # Add File Use Case
//!
//! `addFile` classifies content as text or binary from the path and bytes,
//! writes it into the working copy, and creates (or touches) the path's
//! `FileEntry` immediately — classification does not wait for the next
//! checkpoint. A path written directly to storage without going through
//! this use case (as most tests in this crate do, to stay port-only) is
//! still classified at checkpoint time, via the same `classify_is_text`
//! function, through `FileChange::Added { is_text, .. }`.

use std::sync::Arc;

use crate::domain::manifest::{FileEntry, FileType, Manifest};
use crate::error::JcfResult;
use crate::ports::StoragePort;

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "pdf", "zip", "gz", "tar", "exe", "dll", "so",
    "dylib", "bin", "woff", "woff2", "ttf", "otf", "mp3", "mp4", "mov", "avi", "wasm",
];

/// Content/path heuristic: a known binary extension always wins; otherwise
/// valid UTF-8 with no NUL bytes is classified text.
pub fn classify_is_text(path: &str, content: &[u8]) -> bool {
    if let Some(ext) = path.rsplit('.').next() {
        if BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return false;
        }
    }
    std::str::from_utf8(content).is_ok() && !content.contains(&0)
}

#[derive(Debug, Clone)]
pub struct AddFileInput {
    pub path: String,
    pub bytes: Vec<u8>,
}

pub struct AddFileUseCase<S> {
    storage: Arc<S>,
}

impl<S: StoragePort> AddFileUseCase<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn execute(&self, manifest: &mut Manifest, input: AddFileInput) -> JcfResult<()> {
        let is_text = classify_is_text(&input.path, &input.bytes);
        self.storage
            .write(&format!("content/{}", input.path), &input.bytes)
            .await?;

        let now = chrono::Utc::now().to_rfc3339();
        match manifest.file_map.get_mut(&input.path) {
            Some(entry) => entry.modified = now,
            None => {
                manifest.file_map.insert(
                    input.path.clone(),
                    FileEntry {
                        inode_id: uuid::Uuid::new_v4().to_string(),
                        file_type: if is_text { FileType::Text } else { FileType::Binary },
                        encoding: if is_text { Some("utf-8".to_string()) } else { None },
                        current_hash: None,
                        size: None,
                        mime: None,
                        created: now.clone(),
                        modified: now,
                        extra: None,
                    },
                );
            }
        }
        Ok(())
    }
}
