//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::model::BridgeConfig;
use crate::config::parser::{parse_bridge_config, ParseError};
use crate::config::schema::BridgeSettings;
use crate::config::validation::{validate_config, validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings {}: {source}", path.display())]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings {}: {source}", path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Load and validate runtime settings; defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<BridgeSettings, ConfigError> {
    let settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::SettingsIo {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::SettingsParse {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => BridgeSettings::default(),
    };

    validate_settings(&settings)?;
    Ok(settings)
}

/// Read both sources, parse them and validate the result.
pub fn load_bridge_config(connections: &Path, queue_pairs: &Path) -> Result<BridgeConfig, ConfigError> {
    let connections_text = read_source(connections)?;
    let pairs_text = read_source(queue_pairs)?;

    let config = parse_bridge_config(
        &connections_text,
        &connections.display().to_string(),
        &pairs_text,
        &queue_pairs.display().to_string(),
    )?;

    validate_config(&config)?;

    tracing::debug!(
        connections = config.connections.len(),
        queue_pairs = config.queue_pairs.len(),
        "Bridge configuration loaded"
    );
    Ok(config)
}

fn read_source(path: &Path) -> Result<String, ParseError> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ParseError::ConfigNotFound {
            path: path.to_path_buf(),
        },
        _ => ParseError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}
