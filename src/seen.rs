//! Persistent ledger of article URLs that have already been processed.
//!
//! The set only ever grows. It is loaded once at the start of a run and fully
//! rewritten once the fetch stage has finished. Concurrent runs are not
//! supported: two processes would race on the same file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SeenFile {
    #[serde(default)]
    urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    urls: BTreeSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the set from `path`. A missing file is an empty set; a corrupt one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No seen-set at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read seen-set {}", path.display()))?;
        let parsed: SeenFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seen-set {}", path.display()))?;

        let set = parsed.urls.into_iter().collect::<Self>();
        info!("Loaded {} seen URLs from {}", set.len(), path.display());
        Ok(set)
    }

    /// Writes the whole set, replacing the previous file atomically via rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let payload = SeenFile {
            urls: self.urls.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&payload)?;

        let tmp_path = temp_path_for(path);
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace seen-set {}", path.display()))?;

        info!("Saved {} seen URLs to {}", self.len(), path.display());
        Ok(())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns true if the URL was not already present.
    pub fn insert(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn is_superset(&self, other: &SeenSet) -> bool {
        self.urls.is_superset(&other.urls)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl FromIterator<String> for SeenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "seen".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = SeenSet::load(&dir.path().join("posted.json")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("posted.json");

        let mut set = SeenSet::new();
        assert!(set.insert("https://example.com/b"));
        assert!(set.insert("https://example.com/a"));
        assert!(!set.insert("https://example.com/a"));
        set.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value["urls"],
            serde_json::json!(["https://example.com/a", "https://example.com/b"])
        );
        assert!(!temp_path_for(&path).exists());

        let loaded = SeenSet::load(&path).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted.json");
        fs::write(&path, "{not json").unwrap();
        assert!(SeenSet::load(&path).is_err());
    }

    #[test]
    fn test_insert_only_grows() {
        let mut set: SeenSet = vec!["https://a".to_string()].into_iter().collect();
        let snapshot = set.clone();

        assert!(!set.insert("https://a"));
        assert!(set.insert("https://b"));
        assert!(set.is_superset(&snapshot));
        assert!(set.contains("https://b"));
        assert_eq!(set.len(), 2);
    }
}
