//! The `paperdrill sync` command.

use std::path::PathBuf;

use anyhow::Result;

use paperdrill_core::traits::PaperSource;
use paperdrill_notion::NotionClient;
use paperdrill_providers::config::load_config_from;
use paperdrill_store::PaperCache;

use super::DataPaths;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let Some(notion) = &config.notion else {
        anyhow::bail!(
            "no [notion] section in config. Run `paperdrill init` and fill in \
             your integration token and database id"
        );
    };

    let client = NotionClient::new(&notion.api_key, &notion.database_id, notion.base_url.clone());
    let source: &dyn PaperSource = &client;

    eprintln!("Syncing papers from {}...", source.name());
    let papers = source.fetch_papers().await?;

    let paths = DataPaths::from_config(&config);
    PaperCache::new(&paths.papers).save(&papers)?;

    println!("Synced {} papers to {}", papers.len(), paths.papers.display());
    Ok(())
}
