//! The `paperdrill stats` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use paperdrill_core::statistics::compute_study_stats;
use paperdrill_providers::config::load_config_from;
use paperdrill_store::{JsonStatsStore, PaperCache};

use super::DataPaths;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let paths = DataPaths::from_config(&config);

    let papers = PaperCache::new(&paths.papers).load()?;
    if papers.is_empty() {
        println!("No papers synced yet. Run `paperdrill sync` first.");
        return Ok(());
    }

    let store = JsonStatsStore::open(&paths.stats)?;
    let stats = compute_study_stats(&papers, store.all(), Utc::now());

    let fmt_opt = |value: Option<f64>, suffix: &str| {
        value
            .map(|v| format!("{v:.1}{suffix}"))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Papers"), Cell::new(stats.total_papers)]);
    table.add_row(vec![
        Cell::new("Never reviewed"),
        Cell::new(stats.never_reviewed),
    ]);
    table.add_row(vec![Cell::new("Due"), Cell::new(stats.due)]);
    table.add_row(vec![Cell::new("Soon"), Cell::new(stats.soon)]);
    table.add_row(vec![Cell::new("OK"), Cell::new(stats.ok)]);
    table.add_row(vec![
        Cell::new("Total sessions"),
        Cell::new(stats.total_reviews),
    ]);
    table.add_row(vec![
        Cell::new("Average mastery"),
        Cell::new(fmt_opt(stats.avg_mastery, "%")),
    ]);
    table.add_row(vec![
        Cell::new("Average ease"),
        Cell::new(fmt_opt(stats.avg_ease, "")),
    ]);

    println!("{table}");
    Ok(())
}
