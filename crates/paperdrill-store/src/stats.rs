//! Per-paper review stats persistence.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use paperdrill_core::model::PaperReviewStats;
use paperdrill_core::traits::StatsStore;

/// A JSON-file-backed stats store.
///
/// The whole map is held in memory; `save` rewrites the file
/// atomically via a temp file in the same directory, so readers never
/// observe a torn write and a crash cannot lose the previous state.
pub struct JsonStatsStore {
    path: PathBuf,
    stats: HashMap<String, PaperReviewStats>,
}

impl JsonStatsStore {
    /// Open the store, loading existing records. A missing file is an
    /// empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let stats = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read stats from {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse stats file {}", path.display()))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            stats,
        })
    }

    /// All records, keyed by paper id.
    pub fn all(&self) -> &HashMap<String, PaperReviewStats> {
        &self.stats
    }

    /// Delete all records and the backing file.
    pub fn reset(&mut self) -> Result<()> {
        self.stats.clear();
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl StatsStore for JsonStatsStore {
    fn get(&self, paper_id: &str) -> Option<PaperReviewStats> {
        self.stats.get(paper_id).cloned()
    }

    fn put(&mut self, paper_id: &str, stats: PaperReviewStats) {
        self.stats.insert(paper_id.to_string(), stats);
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.stats).context("failed to serialize stats")?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        tmp.write_all(json.as_bytes())
            .context("failed to write stats")?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to persist stats to {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStatsStore::open(&dir.path().join("stats.json")).unwrap();
        assert!(store.all().is_empty());
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn save_then_reopen_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let mut store = JsonStatsStore::open(&path).unwrap();
        let mut stats = PaperReviewStats::default();
        stats
            .record_session(
                80.0,
                paperdrill_core::model::QualityRating::Good,
                Utc::now(),
            )
            .unwrap();
        store.put("page-1", stats.clone());
        store.save().unwrap();

        let reopened = JsonStatsStore::open(&path).unwrap();
        assert_eq!(reopened.get("page-1"), Some(stats));
        assert_eq!(reopened.all().len(), 1);
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.json");

        let mut store = JsonStatsStore::open(&path).unwrap();
        store.put("p", PaperReviewStats::default());
        store.save().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn reset_clears_records_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let mut store = JsonStatsStore::open(&path).unwrap();
        store.put("page-1", PaperReviewStats::default());
        store.save().unwrap();
        assert!(path.exists());

        store.reset().unwrap();
        assert!(store.all().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(JsonStatsStore::open(&path).is_err());
    }
}
