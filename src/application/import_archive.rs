//! Import Archive Use Case
//!
//! Decodes a ZIP-shaped container via `ArchiveCodec` (mimetype framing,
//! entry integrity) and replays every entry into a `StoragePort`, returning
//! the parsed manifest for the caller to install as the active one.

use std::sync::Arc;

use crate::domain::manifest::Manifest;
use crate::error::JcfResult;
use crate::infrastructure::archive_codec::ArchiveCodec;
use crate::ports::StoragePort;

#[derive(Debug)]
pub struct ImportArchiveInput {
    pub archive_data: Vec<u8>,
}

#[derive(Debug, serde::Serialize)]
pub struct ImportArchiveOutput {
    pub manifest: Manifest,
    pub files_imported: usize,
    pub total_size: usize,
}

pub struct ImportArchiveUseCase<S> {
    storage: Arc<S>,
    codec: ArchiveCodec,
}

impl<S: StoragePort> ImportArchiveUseCase<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            codec: ArchiveCodec::new(),
        }
    }

    pub async fn execute(&self, input: ImportArchiveInput) -> JcfResult<ImportArchiveOutput> {
        let entries = self.codec.decode(&input.archive_data)?;

        let manifest_bytes = entries
            .iter()
            .find(|(name, _)| name == "manifest.json")
            .map(|(_, data)| data.clone())
            .ok_or_else(|| {
                crate::error::JcfError::InvalidContainer("missing manifest.json entry".into())
            })?;
        let manifest = Manifest::from_canonical_bytes(&manifest_bytes)?;
        manifest.check_compatible()?;

        let mut files_imported = 0;
        let mut total_size = 0;

        for (name, data) in entries {
            if name == "mimetype" || name == "manifest.json" {
                continue;
            }
            total_size += data.len();
            self.storage
                .write(&name, &data)
                .await
                .map_err(crate::error::JcfError::from)?;
            files_imported += 1;
        }

        Ok(ImportArchiveOutput {
            manifest,
            files_imported,
            total_size,
        })
    }
}
