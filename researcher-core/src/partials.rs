//! Partial result persistence.
//!
//! Completed provider output is saved the moment it arrives, one file per
//! provider under the playground's `research/.partial/` directory. A later
//! `--resume` run treats those providers as already completed instead of
//! re-submitting (and re-paying for) the research. Writes are idempotent
//! overwrites; the last successful write wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::persistence;

const MANIFEST_FILE: &str = "manifest.json";

/// Store of per-provider partial results for one playground (one session).
#[derive(Debug, Clone)]
pub struct PartialStore {
    partial_dir: PathBuf,
}

impl PartialStore {
    /// Create a store rooted at the playground's `research/.partial/`
    /// directory. Nothing is created on disk until the first save.
    pub fn new(playground_dir: &Path) -> Self {
        Self {
            partial_dir: playground_dir.join("research").join(".partial"),
        }
    }

    fn path_for(&self, provider: &str) -> PathBuf {
        self.partial_dir.join(format!("{}.md", provider))
    }

    /// Whether a partial record exists for the provider.
    pub fn has(&self, provider: &str) -> bool {
        self.path_for(provider).is_file()
    }

    /// Load a provider's partial content. A missing record is `Ok(None)`,
    /// never an error.
    pub fn load(&self, provider: &str) -> io::Result<Option<String>> {
        let path = self.path_for(provider);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    /// Save (or overwrite) a provider's partial content.
    pub fn save(&self, provider: &str, content: &str) -> io::Result<()> {
        persistence::atomic_write(&self.path_for(provider), content.as_bytes())
    }

    /// Provider names with an existing partial record, sorted.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.partial_dir) else {
            return Vec::new();
        };
        let mut providers: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        providers.sort();
        providers
    }

    /// Record the run manifest alongside the partials.
    pub fn save_manifest(&self, manifest: &RunManifest) -> io::Result<()> {
        persistence::atomic_write_json(&self.partial_dir.join(MANIFEST_FILE), manifest)
    }

    /// Load the manifest from a previous run, if any.
    pub fn load_manifest(&self) -> io::Result<Option<RunManifest>> {
        persistence::load_json(&self.partial_dir.join(MANIFEST_FILE))
    }
}

/// Diagnostic record of one research run, written at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub playground: String,
    /// Providers requested for this run, in request order.
    pub providers: Vec<String>,
    /// Model in effect per provider at dispatch.
    pub models: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
}

impl RunManifest {
    pub fn new(
        playground: impl Into<String>,
        providers: Vec<String>,
        models: BTreeMap<String, String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            playground: playground.into(),
            providers,
            models,
            started_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());

        assert!(!store.has("openai"));
        store.save("openai", "# Findings\n\nDetails.").unwrap();
        assert!(store.has("openai"));
        assert_eq!(
            store.load("openai").unwrap().as_deref(),
            Some("# Findings\n\nDetails.")
        );
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());
        assert_eq!(store.load("gemini").unwrap(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());

        store.save("openai", "X").unwrap();
        store.save("openai", "Y").unwrap();
        assert_eq!(store.load("openai").unwrap().as_deref(), Some("Y"));
    }

    #[test]
    fn test_list_sorted_md_only() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());

        store.save("openai", "a").unwrap();
        store.save("gemini", "b").unwrap();
        store
            .save_manifest(&RunManifest::new(
                "pg",
                vec!["openai".into()],
                BTreeMap::new(),
            ))
            .unwrap();

        assert_eq!(store.list(), vec!["gemini".to_string(), "openai".to_string()]);
    }

    #[test]
    fn test_list_empty_without_dir() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());

        let mut models = BTreeMap::new();
        models.insert("openai".to_string(), "o3-deep-research".to_string());
        let manifest = RunManifest::new(
            "meaning-autogenesis",
            vec!["openai".into(), "gemini".into()],
            models,
        );

        store.save_manifest(&manifest).unwrap();
        let loaded = store.load_manifest().unwrap().unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_missing_manifest_is_none() {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path());
        assert_eq!(store.load_manifest().unwrap(), None);
    }
}
