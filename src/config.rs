use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn, Level};

const CONFIG_DIR: &str = ".config/device-topics";
const CONFIG_FILE: &str = "config.toml";
const TEMPLATES_FILE: &str = "templates.toml";

/// Settings of the command line front end.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Device id used when previewing topics without an explicit one
    pub preview_device_id: String,
    /// Template file; defaults to `templates.toml` in the config directory
    pub templates_file: Option<PathBuf>,
    /// One of trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preview_device_id: "device-id".to_string(),
            templates_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the config from `path`, or from the default location when `None`.
    /// A missing file yields the defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
    }

    pub fn templates_path(&self) -> PathBuf {
        self.templates_file
            .clone()
            .unwrap_or_else(|| config_dir().join(TEMPLATES_FILE))
    }

    /// The configured log level, `None` if it is not a level name.
    pub fn level(&self) -> Option<Level> {
        self.log_level.parse().ok()
    }
}

pub fn config_dir() -> PathBuf {
    get_home_dir().join(CONFIG_DIR)
}

pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
