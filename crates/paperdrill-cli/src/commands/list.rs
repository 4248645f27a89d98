//! The `paperdrill list` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use paperdrill_core::priority::{rank_papers, ReviewStatus};
use paperdrill_providers::config::load_config_from;
use paperdrill_store::{JsonStatsStore, PaperCache};

use super::DataPaths;

pub fn execute(due_only: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let paths = DataPaths::from_config(&config);

    let papers = PaperCache::new(&paths.papers).load()?;
    if papers.is_empty() {
        println!("No papers synced yet. Run `paperdrill sync` first.");
        return Ok(());
    }

    let store = JsonStatsStore::open(&paths.stats)?;
    let now = Utc::now();
    let ranked = rank_papers(&papers, store.all(), now);

    let mut table = Table::new();
    table.set_header(vec![
        "Title", "Status", "Priority", "Mastery", "Reviews", "Interval", "Due",
    ]);

    let mut shown = 0usize;
    for entry in &ranked {
        if due_only && entry.status != ReviewStatus::Due {
            continue;
        }
        shown += 1;

        let mastery = entry
            .stats
            .and_then(|s| s.mastery_score)
            .map(|m| format!("{m:.0}%"))
            .unwrap_or_else(|| "-".to_string());
        let reviews = entry
            .stats
            .map(|s| s.review_count.to_string())
            .unwrap_or_else(|| "0".to_string());
        let interval = entry
            .stats
            .map(|s| format!("{}d", s.interval))
            .unwrap_or_else(|| "-".to_string());
        let due = entry
            .stats
            .and_then(|s| s.due_date)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(&entry.paper.title),
            Cell::new(entry.status.to_string()),
            Cell::new(format!("{:.0}", entry.score)),
            Cell::new(mastery),
            Cell::new(reviews),
            Cell::new(interval),
            Cell::new(due),
        ]);
    }

    if shown == 0 {
        println!("Nothing due right now.");
    } else {
        println!("{table}");
    }

    Ok(())
}
