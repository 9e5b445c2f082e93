use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::mode::ChatMode;

/// Used when nothing else names a backend
pub const FALLBACK_BASE_URL: &str = "http://localhost:7071";

/// Environment variable read at build time and again at run time
pub const BASE_URL_ENV: &str = "RAG_API_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("config I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub mode: Option<String>,
    pub default_open: Option<bool>,
    pub position: Option<String>,
    pub welcome_message: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            mode: Some(ChatMode::default().as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("lundo").join("config.json"))
    }

    /// Pick the backend URL: explicit override, then the runtime
    /// `RAG_API_URL`, then the config file, then the value baked in at build
    /// time, then localhost.
    pub fn resolve_base_url(&self, cli_override: Option<&str>) -> String {
        let runtime_env = std::env::var(BASE_URL_ENV).ok();
        resolve_base_url(cli_override, runtime_env.as_deref(), self.base_url.as_deref())
    }

    pub fn chat_mode(&self) -> ChatMode {
        self.mode
            .as_deref()
            .and_then(ChatMode::from_str)
            .unwrap_or_default()
    }
}

fn resolve_base_url(cli: Option<&str>, runtime_env: Option<&str>, file: Option<&str>) -> String {
    [cli, runtime_env, file, option_env!("RAG_API_URL")]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(FALLBACK_BASE_URL)
        .trim_end_matches('/')
        .to_string()
}
