//! The `paperdrill reset` command.

use std::path::PathBuf;

use anyhow::Result;

use paperdrill_providers::config::load_config_from;
use paperdrill_store::JsonStatsStore;

use super::DataPaths;

pub fn execute(yes: bool, config_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(
        yes,
        "this deletes all review statistics; pass --yes to confirm"
    );

    let config = load_config_from(config_path.as_deref())?;
    let paths = DataPaths::from_config(&config);

    let mut store = JsonStatsStore::open(&paths.stats)?;
    let count = store.all().len();
    store.reset()?;

    println!("Cleared review statistics for {count} paper(s).");
    Ok(())
}
