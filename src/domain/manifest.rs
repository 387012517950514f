use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::EngineConfig;
use crate::error::{JcfError, JcfResult};

/// `formatVersion`: semver triple. Readers reject an unknown major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatVersion(pub u64, pub u64, pub u64);

impl FormatVersion {
    pub const CURRENT: FormatVersion = FormatVersion(1, 0, 0);
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

impl Serialize for FormatVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut parts = s.splitn(3, '.');
        let mut next = || -> Result<u64, D::Error> {
            parts
                .next()
                .ok_or_else(|| serde::de::Error::custom("formatVersion must be M.m.p"))?
                .parse::<u64>()
                .map_err(|e| serde::de::Error::custom(format!("invalid formatVersion segment: {e}")))
        };
        Ok(FormatVersion(next()?, next()?, next()?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "formatVersion")]
    pub format_version: FormatVersion,

    pub metadata: ProjectMetadata,

    #[serde(rename = "fileMap")]
    pub file_map: HashMap<String, FileEntry>,

    #[serde(rename = "versionHistory")]
    pub version_history: Vec<crate::domain::version::Version>,

    pub refs: HashMap<String, String>,

    #[serde(rename = "renameLog")]
    pub rename_log: Vec<RenameEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<EngineConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub author: String,
    pub created: String,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
    pub application: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(rename = "inodeId")]
    pub inode_id: String,

    #[serde(rename = "type")]
    pub file_type: FileType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(rename = "currentHash", skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    pub created: String,
    pub modified: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Binary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameEntry {
    #[serde(rename = "inodeId")]
    pub inode_id: String,
    #[serde(rename = "fromPath")]
    pub from_path: String,
    #[serde(rename = "toPath")]
    pub to_path: String,
    #[serde(rename = "versionId")]
    pub version_id: String,
    pub timestamp: String,
}

pub const HEAD_REF: &str = "head";

impl Manifest {
    /// Create an empty manifest for a freshly created container.
    pub fn new(metadata: ProjectMetadata, config: EngineConfig) -> Self {
        Self {
            format_version: FormatVersion::CURRENT,
            metadata,
            file_map: HashMap::new(),
            version_history: Vec::new(),
            refs: HashMap::new(),
            rename_log: Vec::new(),
            config: Some(config),
            extra: None,
        }
    }

    pub fn head(&self) -> Option<&str> {
        self.refs.get(HEAD_REF).map(String::as_str)
    }

    pub fn version(&self, id: &str) -> Option<&crate::domain::version::Version> {
        self.version_history.iter().find(|v| v.id == id)
    }

    /// Reject manifests whose major `formatVersion` this engine doesn't know.
    pub fn check_compatible(&self) -> JcfResult<()> {
        if self.format_version.0 != FormatVersion::CURRENT.0 {
            return Err(JcfError::ManifestCorruption(format!(
                "unsupported formatVersion major {} (expected {})",
                self.format_version.0,
                FormatVersion::CURRENT.0
            )));
        }
        Ok(())
    }

    /// Canonical JSON: UTF-8, no BOM, LF newlines, keys sorted at every
    /// level, no trailing whitespace. Byte-stable for integrity checks.
    pub fn canonicalize(&self) -> JcfResult<Vec<u8>> {
        let value = serde_json::to_value(self)
            .map_err(|e| JcfError::ManifestCorruption(format!("serialize failed: {e}")))?;
        let sorted = sort_keys(value);
        let mut bytes = serde_json::to_vec(&sorted)
            .map_err(|e| JcfError::ManifestCorruption(format!("serialize failed: {e}")))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn from_canonical_bytes(bytes: &[u8]) -> JcfResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| JcfError::ManifestCorruption(format!("parse failed: {e}")))
    }
}

/// Re-serialize a `serde_json::Value` with object keys sorted lexicographically
/// at every level. `serde_json`'s default `Map` preserves insertion order
/// unless the `preserve_order` feature is disabled; sorting explicitly makes
/// the guarantee independent of that feature flag.
fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            for key in keys {
                let v = map[&key].clone();
                sorted.insert(key, sort_keys(v));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_keys).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_metadata() -> ProjectMetadata {
        ProjectMetadata {
            author: "a".into(),
            created: "2024-01-01T00:00:00Z".into(),
            last_modified: "2024-01-01T00:00:00Z".into(),
            application: "jcf".into(),
            description: None,
            tags: None,
            extra: None,
        }
    }

    #[test]
    fn format_version_round_trips() {
        let v = FormatVersion(1, 2, 3);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let parsed: FormatVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn rejects_unknown_major() {
        let mut m = Manifest::new(test_metadata(), EngineConfig::default());
        m.format_version = FormatVersion(99, 0, 0);
        assert!(m.check_compatible().is_err());
    }

    #[test]
    fn canonical_bytes_round_trip() {
        let m = Manifest::new(test_metadata(), EngineConfig::default());
        let bytes = m.canonicalize().unwrap();
        assert!(!bytes.starts_with(&[0xEF, 0xBB, 0xBF]), "must have no BOM");
        let restored = Manifest::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(restored.metadata.author, m.metadata.author);
    }

    #[test]
    fn canonical_bytes_are_deterministic() {
        let m = Manifest::new(test_metadata(), EngineConfig::default());
        assert_eq!(m.canonicalize().unwrap(), m.canonicalize().unwrap());
    }
}
