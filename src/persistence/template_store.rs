//! Topic template sets stored as TOML.
//!
//! ```toml
//! [[topics]]
//! name = "Telemetry Data"
//! topicPattern = "devices/{deviceId}/telemetry"
//! direction = "SUBSCRIBE"
//! qos = 0
//! retain = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mqtt::topic::{default_templates, TopicDraft};
use crate::provisioning::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSet {
    #[serde(default)]
    pub topics: Vec<TopicDraft>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize templates: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Template #{index} ({name}) is invalid: {source}")]
    Invalid {
        index: usize,
        name: String,
        #[source]
        source: ValidationError,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Parses and validates a template set.
pub fn parse_templates(path: &Path, content: &str) -> Result<Vec<TopicDraft>, StoreError> {
    let set: TemplateSet = toml::from_str(content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for (index, draft) in set.topics.iter().enumerate() {
        draft.validate().map_err(|source| StoreError::Invalid {
            index,
            name: draft.name.clone(),
            source,
        })?;
    }
    Ok(set.topics)
}

/// Loads templates from `path`, falling back to the built-in defaults when
/// the file does not exist.
pub async fn load_templates(path: &Path) -> Result<Vec<TopicDraft>, StoreError> {
    if !tokio::fs::try_exists(path).await.map_err(io_error(path))? {
        warn!(
            "Template file {} does not exist, using defaults",
            path.display()
        );
        return Ok(default_templates());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(io_error(path))?;
    let templates = parse_templates(path, &content)?;
    debug!(
        "Loaded {} templates from {}",
        templates.len(),
        path.display()
    );
    Ok(templates)
}

/// Writes templates to `path`, creating parent directories as needed.
///
/// Invalid drafts are refused so that a saved file always loads again.
pub async fn save_templates(path: &Path, templates: &[TopicDraft]) -> Result<(), StoreError> {
    for (index, draft) in templates.iter().enumerate() {
        draft.validate().map_err(|source| StoreError::Invalid {
            index,
            name: draft.name.clone(),
            source,
        })?;
    }

    let set = TemplateSet {
        topics: templates.to_vec(),
    };
    let content = toml::to_string_pretty(&set)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error(parent))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(io_error(path))?;
    info!("Saved {} templates to {}", templates.len(), path.display());
    Ok(())
}
