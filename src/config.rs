//! Engine-wide tunables.
//!
//! A plain struct with a `Default` impl, mirroring how configuration is
//! shaped elsewhere in this codebase's lineage: no environment-variable
//! globals, no file-based loader (the engine is a library, not a CLI).

use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Entries at or above this size use streaming read/write paths.
    #[serde(rename = "streamingThresholdBytes")]
    pub streaming_threshold_bytes: u64,

    /// Maximum size accepted for a single blob; larger inputs fail with
    /// `BlobTooLarge`.
    #[serde(rename = "maxBlobSizeBytes")]
    pub max_blob_size_bytes: u64,

    /// Grace window before an orphaned blob/delta becomes eligible for GC.
    #[serde(rename = "gcGracePeriodSecs")]
    pub gc_grace_period_secs: u64,

    /// Every `snapshot_interval`-th version gets full-text snapshots of the
    /// text files it touches, bounding worst-case restore cost.
    #[serde(rename = "snapshotInterval")]
    pub snapshot_interval: u64,

    /// LRU cache bound, in bytes, for frequently accessed blobs/deltas.
    #[serde(rename = "lruCacheBytes")]
    pub lru_cache_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streaming_threshold_bytes: 50 * MIB,
            max_blob_size_bytes: 500 * MIB,
            gc_grace_period_secs: 7 * 24 * 60 * 60,
            snapshot_interval: 50,
            lru_cache_bytes: 64 * MIB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.streaming_threshold_bytes, 50 * MIB);
        assert_eq!(cfg.max_blob_size_bytes, 500 * MIB);
        assert_eq!(cfg.gc_grace_period_secs, 7 * 24 * 60 * 60);
        assert_eq!(cfg.snapshot_interval, 50);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, restored);
    }
}
