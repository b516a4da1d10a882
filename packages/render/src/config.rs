use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "stencil.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Render session configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Tag of the snapshot marker placed before each render host
    #[serde(default = "default_marker_tag")]
    pub marker_tag: String,

    /// Attribute carrying the host identity, on hosts and their markers
    #[serde(default = "default_host_id_attr")]
    pub host_id_attr: String,

    /// Attribute naming the snapshot encoding on markers
    #[serde(default = "default_encoding_attr")]
    pub encoding_attr: String,

    /// Attribute holding the snapshot string on markers
    #[serde(default = "default_snapshot_attr")]
    pub snapshot_attr: String,

    /// Attribute tagging component hosts with their definition id
    #[serde(default = "default_component_attr")]
    pub component_attr: String,

    /// Reuse slot expansions of unchanged instances across passes
    #[serde(default = "default_true")]
    pub cache_templates: bool,

    /// Hold ready hooks until the ready signal; when off they run inline
    #[serde(default = "default_true")]
    pub track_ready: bool,
}

fn default_marker_tag() -> String {
    "script".to_string()
}

fn default_host_id_attr() -> String {
    "data-host-id".to_string()
}

fn default_encoding_attr() -> String {
    "data-encoding".to_string()
}

fn default_snapshot_attr() -> String {
    "data-snapshot".to_string()
}

fn default_component_attr() -> String {
    "data-component".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            marker_tag: default_marker_tag(),
            host_id_attr: default_host_id_attr(),
            encoding_attr: default_encoding_attr(),
            snapshot_attr: default_snapshot_attr(),
            component_attr: default_component_attr(),
            cache_templates: true,
            track_ready: true,
        }
    }
}

impl RenderConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}
