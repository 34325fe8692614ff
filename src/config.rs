//! Configuration management for the Scribe gateway

use std::path::PathBuf;

use crate::processor::ProcessorConfig;
use crate::{Error, Result};

/// Scribe gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory searched for requested files
    pub search_root: PathBuf,

    /// Path to data directory (database)
    pub data_dir: PathBuf,

    /// Completed pairs buffered before an automatic flush
    pub flush_threshold: usize,

    /// Recent pairs offered to the router as context
    pub context_window: usize,

    /// File resolution and extraction tunables
    pub processor: ProcessorConfig,

    /// LLM collaborator settings
    pub llm: LlmConfig,
}

/// LLM collaborator settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key (`OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Model identifier for classification and summarization
    pub model: String,

    /// Chat completions base URL
    pub base_url: String,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if no search root can be determined
    pub fn load() -> Result<Self> {
        let search_root = std::env::var("SCRIBE_SEARCH_ROOT").map_or_else(
            |_| default_search_root(),
            |root| Some(PathBuf::from(root)),
        );
        let Some(search_root) = search_root else {
            return Err(Error::Config(
                "no search root; set SCRIBE_SEARCH_ROOT".to_string(),
            ));
        };

        let data_dir = std::env::var("SCRIBE_DATA_DIR").map_or_else(
            |_| default_data_dir(),
            |dir| Some(PathBuf::from(dir)),
        );
        let Some(data_dir) = data_dir else {
            return Err(Error::Config(
                "no data directory; set SCRIBE_DATA_DIR".to_string(),
            ));
        };

        Ok(Self {
            search_root,
            data_dir,
            flush_threshold: env_usize("SCRIBE_FLUSH_THRESHOLD", 5),
            context_window: env_usize("SCRIBE_CONTEXT_WINDOW", 5),
            processor: ProcessorConfig {
                max_chars: env_usize("SCRIBE_MAX_CHARS", 8000),
                ..ProcessorConfig::default()
            },
            llm: LlmConfig {
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                model: std::env::var("SCRIBE_LLM_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                base_url: std::env::var("SCRIBE_LLM_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            },
        })
    }

    /// Path to the sqlite database file
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("scribe.db")
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// The user's download directory, falling back to the home directory
fn default_search_root() -> Option<PathBuf> {
    let dirs = directories::UserDirs::new()?;
    dirs.download_dir()
        .map(std::path::Path::to_path_buf)
        .or_else(|| Some(dirs.home_dir().to_path_buf()))
}

fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "scribe", "scribe")
        .map(|dirs| dirs.data_dir().to_path_buf())
}
