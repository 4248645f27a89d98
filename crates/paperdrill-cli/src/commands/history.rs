//! The `paperdrill history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use paperdrill_providers::config::load_config_from;
use paperdrill_store::SessionHistory;

use super::DataPaths;

pub fn execute(limit: usize, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let paths = DataPaths::from_config(&config);

    let reports = SessionHistory::new(&paths.sessions).load_all()?;
    if reports.is_empty() {
        println!("No sessions recorded yet. Run `paperdrill study` first.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Paper", "Score", "Rating", "Interval", "Cost"]);

    for report in reports.iter().take(limit.max(1)) {
        table.add_row(vec![
            Cell::new(report.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&report.paper_title),
            Cell::new(format!("{:.0}", report.session_score)),
            Cell::new(report.rating.to_string()),
            Cell::new(format!("{}d", report.review.interval)),
            Cell::new(format!("${:.4}", report.token_usage.estimated_cost_usd)),
        ]);
    }

    println!("{table}");
    if reports.len() > limit {
        println!("({} older sessions not shown)", reports.len() - limit);
    }

    Ok(())
}
