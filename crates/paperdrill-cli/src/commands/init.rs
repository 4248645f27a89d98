//! The `paperdrill init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("paperdrill.toml").exists() {
        println!("paperdrill.toml already exists, skipping.");
    } else {
        std::fs::write("paperdrill.toml", SAMPLE_CONFIG)?;
        println!("Created paperdrill.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit paperdrill.toml with your Notion and LLM API keys");
    println!("  2. Run: paperdrill sync");
    println!("  3. Run: paperdrill study");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# paperdrill configuration

default_provider = "anthropic"
default_model = "claude-sonnet-4-20250514"
question_count = 5
default_temperature = 0.3
data_dir = "./paperdrill-data"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

# Notion integration token and the id of your papers database.
[notion]
api_key = "${NOTION_API_KEY}"
database_id = "your-database-id"
"#;
