use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const API_URL_ENV: &str = "DBNAV_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory with `tree-<kind>.yml` documents overriding the bundled ones.
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("dbnav/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            schema_dir: None,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Applies an explicit base URL override (usually from `DBNAV_API_URL`).
    pub fn with_api_url_override(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        self
    }
}

pub struct ClientConfigStore {
    path: PathBuf,
}

impl ClientConfigStore {
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        let app_dir = config_dir.join("dbnav");
        fs::create_dir_all(&app_dir)?;

        Ok(Self {
            path: app_dir.join("config.json"),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file yields the defaults.
    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(ClientConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Loads the file, then applies the environment override.
    pub fn load_effective(&self) -> Result<ClientConfig, ConfigError> {
        Ok(self
            .load()?
            .with_api_url_override(std::env::var(API_URL_ENV).ok()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
