//! # Engine Façade
//!
//! Wires the ports/adapters and application use cases behind a single entry
//! point with the concurrency discipline from §5: a process-wide lock with
//! checkpoint/restore/move/GC/verify taking it exclusively and queries
//! (read file, list, history) taking it shared. No torn reads: once a
//! caller has the manifest from `read_manifest`, it stays valid until the
//! next mutating call swaps it in under the write guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::add_file::{AddFileInput, AddFileUseCase};
use crate::application::export_archive::ExportArchiveUseCase;
use crate::application::garbage_collect::{GcInput, GcResult, GcUseCase};
use crate::application::import_archive::{ImportArchiveInput, ImportArchiveUseCase};
use crate::application::move_file::{HistoryEntry, MoveFileInput, MoveFileUseCase};
use crate::application::query::{self, FileHistoryEntry, FileInfo, HistoryOptions, VersionDiff};
use crate::application::remove_file::RemoveFileUseCase;
use crate::application::restore_version::{
    RestoreVersionInput, RestoreVersionOutput, RestoreVersionUseCase,
};
use crate::application::save_checkpoint::{
    SaveCheckpointInput, SaveCheckpointOutput, SaveCheckpointUseCase,
};
use crate::application::verify::{VerifyReport, VerifyUseCase};
use crate::config::EngineConfig;
use crate::domain::manifest::Manifest;
use crate::domain::version::Version;
use crate::error::{JcfError, JcfResult};
use crate::observer::{null_observer, Observer};
use crate::ports::{DiffPort, EncryptionPort, HasherPort, StoragePort};

/// Cooperative cancellation signal for long-running operations (§5). Plain
/// `Arc<AtomicBool>` rather than a runtime-specific token type, since the
/// engine itself stays runtime-agnostic beyond `tokio::sync::RwLock`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> JcfResult<()> {
        if self.is_cancelled() {
            Err(JcfError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct Engine<S, D, H, E> {
    manifest: RwLock<Manifest>,
    storage: Arc<S>,
    save_checkpoint: SaveCheckpointUseCase<S, D, H>,
    restore_version: RestoreVersionUseCase<S, D, H, E>,
    add_file: AddFileUseCase<S>,
    remove_file: RemoveFileUseCase<S>,
    gc: GcUseCase<S>,
    move_file: MoveFileUseCase<S>,
    verify: VerifyUseCase<S, H>,
    export: ExportArchiveUseCase<S>,
}

impl<S, D, H, E> Engine<S, D, H, E>
where
    S: StoragePort,
    D: DiffPort,
    H: HasherPort,
    E: EncryptionPort,
{
    pub fn new(
        manifest: Manifest,
        storage: Arc<S>,
        diff: Arc<D>,
        hasher: Arc<H>,
        encryptor: Arc<E>,
        config: EngineConfig,
    ) -> Self {
        Self::with_observer(
            manifest,
            storage,
            diff,
            hasher,
            encryptor,
            config,
            null_observer(),
        )
    }

    pub fn with_observer(
        manifest: Manifest,
        storage: Arc<S>,
        diff: Arc<D>,
        hasher: Arc<H>,
        encryptor: Arc<E>,
        config: EngineConfig,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let save_checkpoint =
            SaveCheckpointUseCase::new(storage.clone(), diff.clone(), hasher.clone(), config.clone())
                .with_observer(observer.clone());
        let restore_version = RestoreVersionUseCase::new(
            storage.clone(),
            diff,
            hasher.clone(),
            encryptor,
            config.max_blob_size_bytes,
        )
        .with_observer(observer);
        let add_file = AddFileUseCase::new(storage.clone());
        let remove_file = RemoveFileUseCase::new(storage.clone());
        let gc = GcUseCase::new(storage.clone());
        let move_file = MoveFileUseCase::new(storage.clone());
        let verify = VerifyUseCase::new(storage.clone(), hasher);
        let export = ExportArchiveUseCase::new(storage.clone());

        Self {
            manifest: RwLock::new(manifest),
            storage,
            save_checkpoint,
            restore_version,
            add_file,
            remove_file,
            gc,
            move_file,
            verify,
            export,
        }
    }

    /// Reopen an existing container: validates the manifest's
    /// `formatVersion` before wiring it into a fresh `Engine`, distinct from
    /// `new`/`import`, which always start from a manifest just built for
    /// this process.
    pub fn open(
        manifest: Manifest,
        storage: Arc<S>,
        diff: Arc<D>,
        hasher: Arc<H>,
        encryptor: Arc<E>,
        config: EngineConfig,
    ) -> JcfResult<Self> {
        manifest.check_compatible()?;
        Ok(Self::new(manifest, storage, diff, hasher, encryptor, config))
    }

    /// Decode an archive and build an `Engine` against a fresh storage
    /// backend, replaying every entry into it.
    pub async fn import(
        storage: Arc<S>,
        diff: Arc<D>,
        hasher: Arc<H>,
        encryptor: Arc<E>,
        config: EngineConfig,
        archive_data: Vec<u8>,
    ) -> JcfResult<Self> {
        let importer = ImportArchiveUseCase::new(storage.clone());
        let output = importer.execute(ImportArchiveInput { archive_data }).await?;
        Ok(Self::new(output.manifest, storage, diff, hasher, encryptor, config))
    }

    /// No owned OS resources to release — storage is `Arc`-shared and may
    /// outlive this handle — but kept for API parity with `open`/`create`.
    pub fn close(self) {}

    /// Snapshot the container as a ZIP-shaped archive per §6.
    pub async fn export(&self) -> JcfResult<Vec<u8>> {
        let manifest = self.manifest.read().await;
        self.export.execute(&manifest).await
    }

    pub async fn checkpoint(
        &self,
        input: SaveCheckpointInput,
        token: Option<&CancellationToken>,
    ) -> JcfResult<SaveCheckpointOutput> {
        if let Some(t) = token {
            t.check()?;
        }
        let mut manifest = self.manifest.write().await;
        self.save_checkpoint.execute(&mut manifest, input).await
    }

    pub async fn restore(
        &self,
        input: RestoreVersionInput,
        token: Option<&CancellationToken>,
    ) -> JcfResult<RestoreVersionOutput> {
        if let Some(t) = token {
            t.check()?;
        }
        let mut manifest = self.manifest.write().await;
        self.restore_version.execute(&mut manifest, input).await
    }

    pub async fn move_file(&self, input: MoveFileInput) -> JcfResult<()> {
        let mut manifest = self.manifest.write().await;
        self.move_file.execute(&mut manifest, input).await
    }

    pub async fn add_file(&self, input: AddFileInput) -> JcfResult<()> {
        let mut manifest = self.manifest.write().await;
        self.add_file.execute(&mut manifest, input).await
    }

    pub async fn remove_file(&self, path: &str) -> JcfResult<()> {
        let manifest = self.manifest.write().await;
        self.remove_file.execute(&manifest, path).await
    }

    pub async fn gc(
        &self,
        input: GcInput,
        now: chrono::DateTime<chrono::Utc>,
    ) -> JcfResult<GcResult> {
        let manifest = self.manifest.write().await;
        self.gc.run(&manifest, input, now).await
    }

    pub async fn verify(&self) -> JcfResult<VerifyReport> {
        let manifest = self.manifest.write().await;
        self.verify.verify(&manifest).await
    }

    // ------------------------------------------------------------------
    // Queries: shared lock per §5.
    // ------------------------------------------------------------------

    /// `getFile(path, versionId?)`. With no `versionId`, reads the working
    /// copy directly; otherwise reconstructs `path` as of that version.
    pub async fn get_file(&self, path: &str, version_id: Option<&str>) -> JcfResult<Vec<u8>> {
        let manifest = self.manifest.read().await;
        match version_id {
            None => Ok(self.storage.read(&format!("content/{path}")).await?),
            Some(vid) => {
                self.restore_version
                    .get_file_at(&manifest, path, vid, None)
                    .await
            }
        }
    }

    /// `listFiles(dir?, versionId?, filter?)`.
    pub async fn list_files(
        &self,
        dir: Option<&str>,
        version_id: Option<&str>,
        filter: Option<&str>,
    ) -> JcfResult<Vec<FileInfo>> {
        let manifest = self.manifest.read().await;
        query::list_files(&manifest, dir, version_id, filter)
    }

    /// `history(opts?)`: checkpoints newest-first.
    pub async fn history(&self, opts: HistoryOptions) -> Vec<Version> {
        let manifest = self.manifest.read().await;
        query::history(&manifest, &opts)
    }

    /// `fileHistory(path)`: every version touching `path`'s inode, oldest
    /// first, following renames.
    pub async fn file_history(&self, path: &str) -> Vec<FileHistoryEntry> {
        let manifest = self.manifest.read().await;
        query::file_history(&manifest, path)
    }

    /// `diff(vA, vB)`: per-path changes between two checkpoints.
    pub async fn diff(&self, version_a: &str, version_b: &str) -> JcfResult<VersionDiff> {
        let manifest = self.manifest.read().await;
        query::diff(&manifest, version_a, version_b)
    }

    pub async fn history_by_inode(&self, inode_id: &str) -> Vec<HistoryEntry> {
        let manifest = self.manifest.read().await;
        self.move_file.history_by_inode(&manifest, inode_id)
    }

    pub async fn head(&self) -> Option<String> {
        let manifest = self.manifest.read().await;
        manifest.head().map(str::to_string)
    }

    pub async fn manifest_snapshot(&self) -> Manifest {
        self.manifest.read().await.clone()
    }
}
