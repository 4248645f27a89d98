//! The synced paper cache.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use paperdrill_core::model::Paper;

/// JSON-file cache of the papers pulled from Notion.
pub struct PaperCache {
    path: PathBuf,
}

impl PaperCache {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Load cached papers. A missing cache is an empty list.
    pub fn load(&self) -> Result<Vec<Paper>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read paper cache {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse paper cache {}", self.path.display()))
    }

    /// Replace the cache with a fresh sync result.
    pub fn save(&self, papers: &[Paper]) -> Result<()> {
        let json =
            serde_json::to_string_pretty(papers).context("failed to serialize paper cache")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write paper cache {}", self.path.display()))?;
        Ok(())
    }
}
