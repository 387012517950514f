//! # Query Operations
//!
//! Read-only views over a `Manifest`: directory listings, checkpoint
//! history, per-file history, and version-to-version diffs. None of these
//! touch storage — they only walk the already-loaded manifest, so they take
//! `&Manifest` directly rather than a use-case struct wired to a port.

use crate::domain::manifest::{FileType, Manifest};
use crate::domain::version::{ChangeType, Version};
use crate::error::{JcfError, JcfResult};

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileInfo {
    pub path: String,
    pub file_type: FileType,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileHistoryEntry {
    pub version_id: String,
    pub path: String,
    pub change_type: Option<ChangeType>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    pub limit: Option<usize>,
    pub since_version_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DiffEntry {
    pub path: String,
    pub change_type: ChangeType,
    pub old_hash: Option<String>,
    pub new_hash: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionDiff {
    pub from: String,
    pub to: String,
    pub entries: Vec<DiffEntry>,
}

/// `listFiles(dir?, versionId?, filter?)`. `dir` matches a path prefix on a
/// path-segment boundary, `filter` a plain substring anywhere in the path.
/// With no `versionId`, lists the current `fileMap`; otherwise lists that
/// version's non-deleted `fileStates`.
pub fn list_files(
    manifest: &Manifest,
    dir: Option<&str>,
    version_id: Option<&str>,
    filter: Option<&str>,
) -> JcfResult<Vec<FileInfo>> {
    let mut out = match version_id {
        None => manifest
            .file_map
            .iter()
            .map(|(path, entry)| FileInfo {
                path: path.clone(),
                file_type: entry.file_type,
                size: entry.size,
            })
            .collect::<Vec<_>>(),
        Some(vid) => {
            let version = manifest
                .version(vid)
                .ok_or_else(|| JcfError::NotFound(vid.to_string()))?;
            version
                .file_states
                .iter()
                .filter(|(_, state)| !state.is_deleted())
                .map(|(path, state)| FileInfo {
                    path: path.clone(),
                    file_type: manifest
                        .file_map
                        .get(path)
                        .map(|e| e.file_type)
                        .unwrap_or(FileType::Binary),
                    size: Some(state.size),
                })
                .collect()
        }
    };

    if let Some(prefix) = dir {
        let prefix = prefix.trim_end_matches('/');
        out.retain(|f| {
            f.path.starts_with(prefix)
                && (f.path.len() == prefix.len() || f.path.as_bytes()[prefix.len()] == b'/')
        });
    }
    if let Some(needle) = filter {
        out.retain(|f| f.path.contains(needle));
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// `history(opts?)`: checkpoints newest-first, optionally capped at
/// `limit` and/or truncated just before `since_version_id`.
pub fn history(manifest: &Manifest, opts: &HistoryOptions) -> Vec<Version> {
    let mut versions: Vec<Version> = manifest.version_history.clone();
    versions.reverse();
    if let Some(since) = &opts.since_version_id {
        if let Some(idx) = versions.iter().position(|v| &v.id == since) {
            versions.truncate(idx);
        }
    }
    if let Some(limit) = opts.limit {
        versions.truncate(limit);
    }
    versions
}

/// `fileHistory(path)`: every version touching `path`'s inode, oldest
/// first, following the path across renames via the shared `inodeId`
/// (§3's "inode preserved across rename" guarantee).
pub fn file_history(manifest: &Manifest, path: &str) -> Vec<FileHistoryEntry> {
    let inode_id = manifest
        .file_map
        .get(path)
        .map(|e| e.inode_id.clone())
        .or_else(|| {
            manifest
                .version_history
                .iter()
                .rev()
                .find_map(|v| v.file_states.get(path).map(|s| s.inode_id.clone()))
        });
    let Some(inode_id) = inode_id else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for version in &manifest.version_history {
        for (p, state) in &version.file_states {
            if state.inode_id == inode_id {
                out.push(FileHistoryEntry {
                    version_id: version.id.clone(),
                    path: p.clone(),
                    change_type: state.change_type,
                    timestamp: version.timestamp.clone(),
                });
            }
        }
    }
    out
}

/// `diff(vA, vB)`: per-path changes between two versions' `fileStates`,
/// comparing recorded hashes/contentRefs rather than bytes — no storage
/// access needed.
pub fn diff(manifest: &Manifest, version_a: &str, version_b: &str) -> JcfResult<VersionDiff> {
    let a = manifest
        .version(version_a)
        .ok_or_else(|| JcfError::NotFound(version_a.to_string()))?;
    let b = manifest
        .version(version_b)
        .ok_or_else(|| JcfError::NotFound(version_b.to_string()))?;

    let mut paths: Vec<&String> = a.file_states.keys().chain(b.file_states.keys()).collect();
    paths.sort();
    paths.dedup();

    let mut entries = Vec::new();
    for path in paths {
        let old = a.file_states.get(path);
        let new = b.file_states.get(path);
        let change_type = match (old, new) {
            (None, Some(n)) if !n.is_deleted() => ChangeType::Added,
            (None, _) => continue,
            (Some(o), None) if !o.is_deleted() => ChangeType::Deleted,
            (Some(_), None) => continue,
            (Some(o), Some(n)) => {
                if o.is_deleted() == n.is_deleted() && o.is_deleted() {
                    continue;
                }
                if o.is_deleted() {
                    ChangeType::Added
                } else if n.is_deleted() {
                    ChangeType::Deleted
                } else if o.hash == n.hash && o.content_ref == n.content_ref {
                    continue;
                } else {
                    ChangeType::Modified
                }
            }
        };
        entries.push(DiffEntry {
            path: path.clone(),
            change_type,
            old_hash: old.and_then(|s| s.hash.clone()),
            new_hash: new.and_then(|s| s.hash.clone()),
        });
    }

    Ok(VersionDiff {
        from: version_a.to_string(),
        to: version_b.to_string(),
        entries,
    })
}
