//! Session report history.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use paperdrill_core::report::SessionReport;

/// Directory of per-session report files.
pub struct SessionHistory {
    dir: PathBuf,
}

impl SessionHistory {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Save a session report under a timestamped file name. Returns
    /// the path written.
    pub fn save(&self, report: &SessionReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let timestamp = report.created_at.format("%Y%m%dT%H%M%S");
        let short_id = &report.id.to_string()[..8];
        let path = self.dir.join(format!("session-{timestamp}-{short_id}.json"));

        report.save_json(&path)?;
        Ok(path)
    }

    /// Load all session reports, newest first. Unparseable files are
    /// skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<SessionReport>> {
        let mut reports = Vec::new();

        if !self.dir.is_dir() {
            return Ok(reports);
        }

        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match SessionReport::load_json(&path) {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        tracing::warn!("skipping {}: {}", path.display(), e);
                    }
                }
            }
        }

        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }
}
