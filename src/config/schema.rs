//! Runtime settings schema.
//!
//! Connections and queue pairs come from their own text sources (see
//! [`crate::config::parser`]). Everything else the bridge needs at runtime
//! lives here and deserializes from an optional TOML file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root of the runtime settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeSettings {
    /// Location of the connection and queue-pair sources.
    pub sources: SourcesConfig,

    /// Error backoff bounds.
    pub retry: RetryConfig,

    /// Blocking receive settings.
    pub receive: ReceiveConfig,

    /// Values passed to the queue-transport client.
    pub client: ClientConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Paths of the two configuration sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// `ibmmq:<connection>:<property>=<value>` lines.
    pub connections_path: PathBuf,

    /// `<queue> <direction> <queue>` lines.
    pub queue_pairs_path: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            connections_path: PathBuf::from("appsettings.config"),
            queue_pairs_path: PathBuf::from("queuepairs.config"),
        }
    }
}

/// Error backoff bounds, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Shortest delay after an error.
    pub floor_secs: u64,

    /// Longest delay after repeated errors.
    pub ceiling_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            floor_secs: 5,
            ceiling_secs: 1800,
        }
    }
}

/// Blocking receive wait, drawn uniformly per attempt.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiveConfig {
    pub wait_min_secs: u64,
    pub wait_max_secs: u64,
}

impl ReceiveConfig {
    pub fn wait_min(&self) -> Duration {
        Duration::from_secs(self.wait_min_secs)
    }

    pub fn wait_max(&self) -> Duration {
        Duration::from_secs(self.wait_max_secs)
    }
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            wait_min_secs: 30,
            wait_max_secs: 60,
        }
    }
}

/// Client identification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Application name reported to the queue manager.
    pub application_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_name: "mq-bridge".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = BridgeSettings::default();
        assert_eq!(settings.retry.floor_secs, 5);
        assert_eq!(settings.retry.ceiling_secs, 1800);
        assert_eq!(settings.receive.wait_min(), Duration::from_secs(30));
        assert_eq!(settings.receive.wait_max(), Duration::from_secs(60));
        assert!(!settings.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: BridgeSettings = toml::from_str(
            r#"
            [retry]
            floor_secs = 1

            [sources]
            queue_pairs_path = "/etc/mq-bridge/queuepairs.config"
            "#,
        )
        .unwrap();

        assert_eq!(settings.retry.floor_secs, 1);
        assert_eq!(settings.retry.ceiling_secs, 1800);
        assert_eq!(settings.sources.connections_path, PathBuf::from("appsettings.config"));
        assert_eq!(
            settings.sources.queue_pairs_path,
            PathBuf::from("/etc/mq-bridge/queuepairs.config")
        );
    }
}
