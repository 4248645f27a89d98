//! Application configuration and backend factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use paperdrill_core::traits::QuizBackend;

use crate::anthropic::AnthropicBackend;
use crate::openai::OpenAiBackend;

/// Configuration for a single quiz backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental
/// exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
        }
    }
}

/// Notion source configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Notion integration token.
    pub api_key: String,
    /// The papers database id.
    pub database_id: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_key", &"***")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Top-level paperdrill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Quiz backend configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Notion source configuration.
    #[serde(default)]
    pub notion: Option<NotionConfig>,
    /// Default backend to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Default model to use.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Questions per session.
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    /// Default temperature for generation and grading.
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Max retries on backend errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max concurrent grading calls.
    #[serde(default = "default_parallelism")]
    pub grading_parallelism: usize,
    /// Directory for the paper cache, stats, and session history.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_question_count() -> usize {
    5
}
fn default_temperature() -> f64 {
    0.3
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_parallelism() -> usize {
    4
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./paperdrill-data")
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            notion: None,
            default_provider: default_provider(),
            default_model: default_model(),
            question_count: default_question_count(),
            default_temperature: default_temperature(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            grading_parallelism: default_parallelism(),
            data_dir: default_data_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a backend config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `paperdrill.toml` in the current directory
/// 2. `~/.config/paperdrill/config.toml`
///
/// Environment variable overrides: `PAPERDRILL_ANTHROPIC_KEY`,
/// `PAPERDRILL_OPENAI_KEY`, `PAPERDRILL_NOTION_KEY`.
pub fn load_config() -> Result<StudyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<StudyConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("paperdrill.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<StudyConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => StudyConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("PAPERDRILL_ANTHROPIC_KEY") {
        config
            .providers
            .entry("anthropic".into())
            .or_insert(ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            });
        if let Some(ProviderConfig::Anthropic { api_key, .. }) =
            config.providers.get_mut("anthropic")
        {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("PAPERDRILL_OPENAI_KEY") {
        config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let Some(ProviderConfig::OpenAI { api_key, .. }) = config.providers.get_mut("openai") {
            *api_key = key;
        }
    }

    // The Notion override needs an existing section: a token alone
    // cannot identify the database.
    if let Ok(key) = std::env::var("PAPERDRILL_NOTION_KEY") {
        if let Some(notion) = config.notion.as_mut() {
            notion.api_key = key;
        }
    }

    // Resolve env vars in all backend configs
    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    if let Some(notion) = config.notion.as_mut() {
        notion.api_key = resolve_env_vars(&notion.api_key);
        notion.database_id = resolve_env_vars(&notion.database_id);
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("paperdrill"))
}

/// Create a quiz backend instance from its configuration.
pub fn create_backend(name: &str, config: &ProviderConfig) -> Result<Box<dyn QuizBackend>> {
    let _ = name;
    match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            Ok(Box::new(AnthropicBackend::new(api_key, base_url.clone())))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Ok(Box::new(OpenAiBackend::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        ))),
    }
}
