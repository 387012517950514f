//! ZIP-shaped archive codec: enforces the JCF container's per-entry
//! compression policy on write, and flat extraction on read.
//!
//! Policy:
//! - `mimetype`: STORE, literal bytes, written first.
//! - `manifest.json`: DEFLATE level 6.
//! - `content/**`: DEFLATE for known-compressible types, STORE for types
//!   that are already compressed; unknown binaries are sampled.
//! - `.store/blobs/**`: STORE (already content-addressed binary).
//! - `.store/deltas/**`: DEFLATE level 9.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{JcfError, JcfResult};

pub const MIMETYPE_ENTRY: &str = "mimetype";
pub const MIMETYPE_CONTENTS: &[u8] = b"application/x-jcf";

const ALREADY_COMPRESSED_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "webp", "mp4", "zip", "gz", "7z", "wasm"];

const SAMPLE_SIZE: usize = 4096;
const SAMPLE_RATIO_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Store,
    Deflate(i64),
    Sampled,
}

fn policy_for(name: &str, data: &[u8]) -> Policy {
    if name == MIMETYPE_ENTRY {
        return Policy::Store;
    }
    if name == "manifest.json" {
        return Policy::Deflate(6);
    }
    if name.starts_with(".store/blobs/") {
        return Policy::Store;
    }
    if name.starts_with(".store/deltas/") {
        return Policy::Deflate(9);
    }
    if name.starts_with("content/") {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        if ALREADY_COMPRESSED_EXTENSIONS.contains(&ext.as_str()) {
            return Policy::Store;
        }
        if looks_like_text(data) {
            return Policy::Deflate(6);
        }
        return Policy::Sampled;
    }
    Policy::Deflate(6)
}

fn looks_like_text(data: &[u8]) -> bool {
    std::str::from_utf8(data).is_ok()
}

/// Sample the first 4 KiB, compress at level 1, and accept DEFLATE only if
/// the compressed/sample ratio is under 0.9. Otherwise fall back to STORE.
fn resolve_sampled(data: &[u8]) -> Policy {
    let sample = &data[..data.len().min(SAMPLE_SIZE)];
    let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::new(1));
    if encoder.write_all(sample).is_err() {
        return Policy::Store;
    }
    let compressed = match encoder.finish() {
        Ok(c) => c,
        Err(_) => return Policy::Store,
    };
    let ratio = compressed.len() as f64 / sample.len().max(1) as f64;
    if ratio < SAMPLE_RATIO_THRESHOLD {
        Policy::Deflate(6)
    } else {
        Policy::Store
    }
}

pub struct ArchiveCodec;

impl ArchiveCodec {
    pub fn new() -> Self {
        Self
    }

    /// Build a ZIP archive from `(name, bytes)` entries. Callers must ensure
    /// `mimetype` is present in `entries`; it is always emitted first
    /// regardless of its position in the input slice.
    pub fn encode(&self, entries: &[(String, Vec<u8>)]) -> JcfResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));

        let mimetype = entries
            .iter()
            .find(|(name, _)| name == MIMETYPE_ENTRY)
            .ok_or_else(|| JcfError::InvalidContainer("missing mimetype entry".into()))?;
        Self::write_entry(&mut zip, &mimetype.0, &mimetype.1)?;

        for (name, data) in entries.iter().filter(|(n, _)| n != MIMETYPE_ENTRY) {
            Self::write_entry(&mut zip, name, data)?;
        }

        zip.finish()
            .map_err(|e| JcfError::InvalidContainer(format!("zip finalize failed: {e}")))?;
        Ok(buffer)
    }

    fn write_entry(
        zip: &mut ZipWriter<Cursor<&mut Vec<u8>>>,
        name: &str,
        data: &[u8],
    ) -> JcfResult<()> {
        let policy = match policy_for(name, data) {
            Policy::Sampled => resolve_sampled(data),
            other => other,
        };
        let options: FileOptions<()> = match policy {
            Policy::Store => FileOptions::default().compression_method(CompressionMethod::Stored),
            Policy::Deflate(level) => FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(level)),
            Policy::Sampled => unreachable!("resolved above"),
        };
        zip.start_file(name, options)
            .map_err(|e| JcfError::InvalidContainer(format!("start_file failed: {e}")))?;
        zip.write_all(data)
            .map_err(|e| JcfError::InvalidContainer(format!("write failed: {e}")))?;
        Ok(())
    }

    /// Extract every entry as `(name, bytes)`. Verifies `mimetype` is first,
    /// STORE, and matches the literal expected payload.
    pub fn decode(&self, bytes: &[u8]) -> JcfResult<Vec<(String, Vec<u8>)>> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| JcfError::InvalidContainer(format!("not a valid zip: {e}")))?;

        if zip.is_empty() {
            return Err(JcfError::InvalidContainer("empty archive".into()));
        }
        {
            let first = zip
                .by_index(0)
                .map_err(|e| JcfError::InvalidContainer(format!("{e}")))?;
            if first.name() != MIMETYPE_ENTRY {
                return Err(JcfError::InvalidContainer(
                    "mimetype is not the first entry".into(),
                ));
            }
            if first.compression() != CompressionMethod::Stored {
                return Err(JcfError::InvalidContainer(
                    "mimetype must be stored uncompressed".into(),
                ));
            }
        }

        let mut out = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| JcfError::InvalidContainer(format!("{e}")))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if name.contains("..") {
                return Err(JcfError::InvalidContainer(format!(
                    "path traversal in entry name: {name}"
                )));
            }
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| JcfError::InvalidContainer(format!("read failed: {e}")))?;
            if name == MIMETYPE_ENTRY && data != MIMETYPE_CONTENTS {
                return Err(JcfError::InvalidContainer(
                    "mimetype payload does not match expected literal".into(),
                ));
            }
            out.push((name, data));
        }
        Ok(out)
    }
}

impl Default for ArchiveCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<(String, Vec<u8>)> {
        vec![
            (MIMETYPE_ENTRY.to_string(), MIMETYPE_CONTENTS.to_vec()),
            ("manifest.json".to_string(), b"{}".to_vec()),
            ("content/readme.txt".to_string(), b"hello world".to_vec()),
            (
                ".store/blobs/abc123".to_string(),
                vec![0u8, 1, 2, 3, 255],
            ),
            (
                ".store/deltas/v2_aaaa.patch".to_string(),
                b"--- a\n+++ b\n".to_vec(),
            ),
        ]
    }

    #[test]
    fn encode_then_decode_preserves_entries() {
        let codec = ArchiveCodec::new();
        let bytes = codec.encode(&entries()).unwrap();
        let decoded = codec.decode(&bytes).unwrap();

        assert_eq!(decoded[0].0, MIMETYPE_ENTRY);
        assert_eq!(decoded[0].1, MIMETYPE_CONTENTS);
        assert!(decoded
            .iter()
            .any(|(n, d)| n == "content/readme.txt" && d == b"hello world"));
    }

    #[test]
    fn encode_rejects_missing_mimetype() {
        let codec = ArchiveCodec::new();
        let entries = vec![("manifest.json".to_string(), b"{}".to_vec())];
        assert!(codec.encode(&entries).is_err());
    }

    #[test]
    fn decode_rejects_non_zip_bytes() {
        let codec = ArchiveCodec::new();
        assert!(codec.decode(b"not a zip file").is_err());
    }

    #[test]
    fn decode_rejects_tampered_mimetype_payload() {
        let codec = ArchiveCodec::new();
        let mut tampered = entries();
        tampered[0].1 = b"text/plain".to_vec();
        let bytes = codec.encode(&tampered).unwrap();
        assert!(codec.decode(&bytes).is_err());
    }

    #[test]
    fn already_compressed_extension_uses_store() {
        assert_eq!(
            policy_for("content/photo.png", &[0u8; 10]),
            Policy::Store
        );
    }

    #[test]
    fn manifest_uses_deflate_6() {
        assert_eq!(policy_for("manifest.json", b"{}"), Policy::Deflate(6));
    }

    #[test]
    fn blob_entries_always_stored() {
        assert_eq!(
            policy_for(".store/blobs/deadbeef", &[1, 2, 3]),
            Policy::Store
        );
    }

    #[test]
    fn delta_entries_use_deflate_9() {
        assert_eq!(
            policy_for(".store/deltas/v1_abcd.patch", b"patch"),
            Policy::Deflate(9)
        );
    }
}
