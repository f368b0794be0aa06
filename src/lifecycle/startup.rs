//! Startup orchestration.
//!
//! Load settings, then both configuration sources, validate, and only then
//! hand the configuration to the bridge. Any error here is fatal and no pair
//! starts.

use std::path::PathBuf;

use crate::config::loader::{load_bridge_config, load_settings, ConfigError};
use crate::config::{BridgeConfig, BridgeSettings};

/// Command-line overrides for the source locations.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    pub settings: Option<PathBuf>,
    pub connections: Option<PathBuf>,
    pub queue_pairs: Option<PathBuf>,
}

/// Load settings and the validated bridge configuration.
pub fn load(overrides: &SourceOverrides) -> Result<(BridgeSettings, BridgeConfig), ConfigError> {
    let mut settings = load_settings(overrides.settings.as_deref())?;
    if let Some(path) = &overrides.connections {
        settings.sources.connections_path = path.clone();
    }
    if let Some(path) = &overrides.queue_pairs {
        settings.sources.queue_pairs_path = path.clone();
    }

    let config = load_bridge_config(
        &settings.sources.connections_path,
        &settings.sources.queue_pairs_path,
    )?;
    Ok((settings, config))
}
