//! Configuration validation.
//!
//! # Responsibilities
//! - Check referential integrity (pairs reference declared connections)
//! - Reject lanes with empty queue or channel names
//! - Check TLS connections carry a cipher spec
//! - Check runtime settings ranges
//!
//! # Design Decisions
//! - Runs once, after parsing and before any forwarding task starts
//! - Reports the first offending pair; missing connections are reported together
//! - Pure functions: config → Result<(), ValidationError>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::model::{connection_key, BridgeConfig};
use crate::config::schema::BridgeSettings;

/// Semantic configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one queue pair must be configured")]
    NoQueuePairs,

    #[error("missing connection keys: {}", names.join(", "))]
    MissingConnections { names: Vec<String> },

    #[error("missing inbound or outbound queue in queue pair {pair}")]
    MissingQueue { pair: String },

    #[error("missing inbound or outbound channel in queue pair {pair}")]
    MissingChannel { pair: String },

    #[error("connection '{connection}' uses TLS but has no sslcipherspec")]
    MissingCipherSpec { connection: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Validate a parsed bridge configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), ValidationError> {
    if config.queue_pairs.is_empty() {
        return Err(ValidationError::NoQueuePairs);
    }

    let mut missing: Vec<String> = Vec::new();
    for pair in &config.queue_pairs {
        for name in [&pair.inbound_connection, &pair.outbound_connection] {
            let already = missing.iter().any(|m| connection_key(m) == connection_key(name));
            if config.connection(name).is_none() && !already {
                missing.push(name.clone());
            }
        }
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingConnections { names: missing });
    }

    if let Some(pair) = config
        .queue_pairs
        .iter()
        .find(|p| p.inbound_queue.trim().is_empty() || p.outbound_queue.trim().is_empty())
    {
        return Err(ValidationError::MissingQueue { pair: pair.to_string() });
    }

    if let Some(pair) = config
        .queue_pairs
        .iter()
        .find(|p| p.inbound_channel.trim().is_empty() || p.outbound_channel.trim().is_empty())
    {
        return Err(ValidationError::MissingChannel { pair: pair.to_string() });
    }

    for pair in &config.queue_pairs {
        for name in [&pair.inbound_connection, &pair.outbound_connection] {
            if let Some(conn) = config.connection(name) {
                if conn.use_tls && conn.ssl_cipher_spec.trim().is_empty() {
                    return Err(ValidationError::MissingCipherSpec {
                        connection: conn.name.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Validate runtime settings.
pub fn validate_settings(settings: &BridgeSettings) -> Result<(), ValidationError> {
    let retry = &settings.retry;
    if retry.floor_secs == 0 || retry.floor_secs > retry.ceiling_secs {
        return Err(ValidationError::InvalidSettings(format!(
            "retry delays need 0 < floor_secs ({}) <= ceiling_secs ({})",
            retry.floor_secs, retry.ceiling_secs
        )));
    }

    let receive = &settings.receive;
    if receive.wait_min_secs == 0 || receive.wait_min_secs > receive.wait_max_secs {
        return Err(ValidationError::InvalidSettings(format!(
            "receive wait needs 0 < wait_min_secs ({}) <= wait_max_secs ({})",
            receive.wait_min_secs, receive.wait_max_secs
        )));
    }

    let observability = &settings.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        return Err(ValidationError::InvalidSettings(format!(
            "metrics_address `{}` is not a socket address",
            observability.metrics_address
        )));
    }

    Ok(())
}
