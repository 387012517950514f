//! Tests for Manifest domain entity
//!
//! Each test focuses on a single aspect of Manifest functionality.

#[cfg(test)]
mod manifest_tests {
    use crate::config::EngineConfig;
    use crate::domain::manifest::{FileEntry, FileType, Manifest, ProjectMetadata, RenameEntry};
    use std::collections::HashMap;

    /// Helper: create a minimal valid manifest
    fn create_test_manifest(author: &str) -> Manifest {
        Manifest::new(
            ProjectMetadata {
                author: author.to_string(),
                description: None,
                created: "2024-01-01T00:00:00Z".to_string(),
                last_modified: "2024-01-01T00:00:00Z".to_string(),
                application: "jcf".to_string(),
                tags: None,
                extra: None,
            },
            EngineConfig::default(),
        )
    }

    // =========================================================================
    // HAPPY PATH TESTS
    // =========================================================================

    #[test]
    fn test_manifest_serializes_to_json() {
        let manifest = create_test_manifest("tester");

        let json = serde_json::to_string(&manifest);

        assert!(json.is_ok(), "Manifest should serialize to JSON");
        assert!(json.unwrap().contains("tester"));
    }

    #[test]
    fn test_manifest_deserializes_from_json() {
        let json = r#"{
            "formatVersion": "1.0.0",
            "metadata": {
                "author": "tester",
                "created": "2024-01-01T00:00:00Z",
                "lastModified": "2024-01-01T00:00:00Z",
                "application": "jcf"
            },
            "fileMap": {},
            "versionHistory": [],
            "refs": {"head": ""},
            "renameLog": []
        }"#;

        let manifest: Result<Manifest, _> = serde_json::from_str(json);

        assert!(manifest.is_ok(), "Should deserialize valid JSON");
        assert_eq!(manifest.unwrap().metadata.author, "tester");
    }

    #[test]
    fn test_manifest_roundtrip_preserves_data() {
        let original = create_test_manifest("roundtrip-author");

        let json = serde_json::to_string(&original).unwrap();
        let restored: Manifest = serde_json::from_str(&json).unwrap();

        assert_eq!(original.metadata.author, restored.metadata.author);
        assert_eq!(
            original.format_version.to_string(),
            restored.format_version.to_string()
        );
    }

    #[test]
    fn test_file_entry_serde_rename() {
        let entry = FileEntry {
            inode_id: "abc123".to_string(),
            file_type: FileType::Text,
            encoding: Some("utf-8".to_string()),
            current_hash: Some("sha256hash".to_string()),
            size: Some(5),
            mime: None,
            created: "2024-01-01T00:00:00Z".to_string(),
            modified: "2024-01-01T00:00:00Z".to_string(),
            extra: None,
        };

        let json = serde_json::to_string(&entry).unwrap();

        assert!(json.contains("\"inodeId\""), "Should use camelCase inodeId");
        assert!(json.contains("\"type\""), "Should rename file_type to type");
        assert!(json.contains("\"currentHash\""), "Should use camelCase currentHash");
    }

    #[test]
    fn test_file_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FileType::Text).unwrap(), "\"text\"");
        assert_eq!(
            serde_json::to_string(&FileType::Binary).unwrap(),
            "\"binary\""
        );
    }

    // =========================================================================
    // EDGE CASE TESTS
    // =========================================================================

    #[test]
    fn test_manifest_with_optional_none() {
        let mut manifest = create_test_manifest("minimal");
        manifest.refs = HashMap::new();

        assert!(serde_json::to_string(&manifest).is_ok());
    }

    #[test]
    fn test_manifest_with_unicode() {
        let manifest = create_test_manifest("Проект 日本語 🚀");

        let json = serde_json::to_string(&manifest).unwrap();
        let restored: Manifest = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.metadata.author, "Проект 日本語 🚀");
    }

    #[test]
    fn test_manifest_with_special_chars() {
        let manifest = create_test_manifest("Name \"with\" quotes \\ and newline\n");

        assert!(serde_json::to_string(&manifest).is_ok());
    }

    #[test]
    fn test_deserialize_missing_optional_fields() {
        let json = r#"{
            "formatVersion": "1.0.0",
            "metadata": {
                "author": "tester",
                "created": "2024-01-01T00:00:00Z",
                "lastModified": "2024-01-01T00:00:00Z",
                "application": "jcf"
            },
            "fileMap": {},
            "versionHistory": [],
            "refs": {},
            "renameLog": []
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();

        assert!(manifest.metadata.description.is_none());
        assert!(manifest.metadata.tags.is_none());
    }

    #[test]
    fn test_rename_entry_serialization() {
        let entry = RenameEntry {
            inode_id: "i1".to_string(),
            from_path: "old/path.txt".to_string(),
            to_path: "new/path.txt".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            version_id: "v123".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();

        assert!(json.contains("\"versionId\""), "Should use camelCase versionId");
        assert!(json.contains("\"fromPath\""));
        assert!(json.contains("\"toPath\""));
    }

    #[test]
    fn test_unknown_format_version_major_rejected() {
        let mut manifest = create_test_manifest("tester");
        manifest.format_version = crate::domain::manifest::FormatVersion(2, 0, 0);
        assert!(manifest.check_compatible().is_err());
    }
}
