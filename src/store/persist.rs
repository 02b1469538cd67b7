//! On-disk image of the memory store
//!
//! All collections are written as a single pretty-printed JSON file. Writes
//! go to a temporary sibling first and are renamed into place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::error::StoreResult;
use super::types::Document;

/// Serialized form of every collection, documents in insertion order
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreFile {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Document>>,
    /// Last server timestamp handed out, so restarts never go backwards
    #[serde(default)]
    pub last_server_timestamp: i64,
}

impl StoreFile {
    /// Load from a JSON file; a missing file is an empty store
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let file: StoreFile = serde_json::from_str(&content)?;
        Ok(file)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = StoreFile::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(file.document_count(), 0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta").join("documents.json");

        let mut file = StoreFile::default();
        file.collections.insert(
            "todos".to_string(),
            vec![Document::new(
                "a",
                json!({"task_text": "Buy milk"}).as_object().unwrap().clone(),
            )],
        );
        file.last_server_timestamp = 42;
        file.save(&path).unwrap();

        let loaded = StoreFile::load(&path).unwrap();
        assert_eq!(loaded, file);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documents.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(StoreFile::load(&path).is_err());
    }
}
