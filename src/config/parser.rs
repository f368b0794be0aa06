//! Parsers for the two line-oriented configuration sources.
//!
//! # Formats
//! ```text
//! connections:  ibmmq:<connection>:<property>=<value>
//! queue pairs:  <queueA> <direction> <queueB>     direction is `>` or `<`
//! ```
//!
//! Blank lines and lines starting with `#`, `;` or `//` are ignored in both.
//!
//! # Design Decisions
//! - Fail fast: a malformed line aborts the load, nothing is skipped
//! - `>` forwards from the first declared connection to the second, `<` the reverse
//! - A `.` queue token means "same name as the other side"
//! - Channels are copied from the connections; empty channels are left to validation

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::model::{connection_key, BridgeConfig, ConnectionDescriptor, QueuePairDescriptor};

const CONNECTION_PREFIX: &str = "ibmmq";
const PLACEHOLDER: &str = ".";

/// Errors raised while reading or parsing configuration sources.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A configuration file does not exist.
    #[error("configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// A configuration file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A significant line does not follow the expected shape.
    #[error("{origin}:{line}: {reason}")]
    ConfigMalformed {
        origin: String,
        line: usize,
        reason: String,
    },

    /// A declared connection has no `channel` property.
    #[error("connection '{connection}' has no channel property")]
    MissingChannel { connection: String },
}

/// Connections in declaration order, as read from the connection source.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTable {
    connections: BTreeMap<String, ConnectionDescriptor>,
    order: Vec<String>,
}

impl ConnectionTable {
    /// Look up a connection by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&ConnectionDescriptor> {
        self.connections.get(&connection_key(name))
    }

    /// Connection names in the order they were first declared.
    pub fn declared(&self) -> impl Iterator<Item = &ConnectionDescriptor> {
        self.order.iter().filter_map(|key| self.connections.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn entry(&mut self, name: &str) -> &mut ConnectionDescriptor {
        let key = connection_key(name);
        if !self.connections.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.connections
            .entry(key)
            .or_insert_with(|| ConnectionDescriptor::new(name.trim()))
    }
}

/// Parse both sources into a [`BridgeConfig`].
///
/// `*_origin` labels the source in error messages (usually the file path).
pub fn parse_bridge_config(
    connections_text: &str,
    connections_origin: &str,
    pairs_text: &str,
    pairs_origin: &str,
) -> Result<BridgeConfig, ParseError> {
    let table = parse_connections(connections_text, connections_origin)?;
    let queue_pairs = parse_queue_pairs(pairs_text, pairs_origin, &table)?;

    if table.len() > 2 {
        tracing::warn!(
            declared = table.len(),
            "More than two connections declared; queue pairs only use the first two"
        );
    }

    Ok(BridgeConfig {
        connections: table.connections,
        queue_pairs,
    })
}

/// Parse the connection-properties source.
pub fn parse_connections(text: &str, origin: &str) -> Result<ConnectionTable, ParseError> {
    let mut table = ConnectionTable::default();
    let mut channels_seen: Vec<String> = Vec::new();

    for (idx, line) in significant_lines(text) {
        let malformed = |reason: String| ParseError::ConfigMalformed {
            origin: origin.to_string(),
            line: idx + 1,
            reason,
        };

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None if has_connection_prefix(line) => {
                return Err(malformed(format!("expected `{}:<name>:<property>=<value>`", CONNECTION_PREFIX)));
            }
            // Other application settings share this file.
            None => continue,
        };

        if !has_connection_prefix(key) {
            continue;
        }

        let parts: Vec<&str> = key.split(':').map(str::trim).collect();
        if parts.len() != 3 || parts[1].is_empty() || parts[2].is_empty() {
            return Err(malformed(format!("invalid connection key `{}`", key)));
        }

        let (name, property) = (parts[1], parts[2]);
        let conn = table.entry(name);
        match property.to_lowercase().as_str() {
            "queuemanagername" => conn.queue_manager_name = value.to_string(),
            "host" => conn.host = value.to_string(),
            "port" => {
                conn.port = value
                    .parse()
                    .map_err(|_| malformed(format!("invalid port `{}` for connection '{}'", value, name)))?;
            }
            "channel" => {
                conn.channel = value.to_string();
                channels_seen.push(connection_key(name));
            }
            "userid" => conn.user_id = value.to_string(),
            "password" => conn.password = value.to_string(),
            "usetls" => {
                conn.use_tls = parse_bool(value)
                    .ok_or_else(|| malformed(format!("invalid boolean `{}` for usetls", value)))?;
            }
            "sslcipherspec" => conn.ssl_cipher_spec = value.to_string(),
            other => {
                tracing::warn!(connection = %name, property = %other, "Ignoring unknown connection property");
            }
        }
    }

    if let Some(conn) = table
        .declared()
        .find(|conn| !channels_seen.contains(&connection_key(&conn.name)))
    {
        return Err(ParseError::MissingChannel {
            connection: conn.name.clone(),
        });
    }

    Ok(table)
}

/// Parse the queue-pair source against already parsed connections.
pub fn parse_queue_pairs(
    text: &str,
    origin: &str,
    connections: &ConnectionTable,
) -> Result<Vec<QueuePairDescriptor>, ParseError> {
    let mut pairs = Vec::new();

    for (idx, line) in significant_lines(text) {
        let malformed = |reason: String| ParseError::ConfigMalformed {
            origin: origin.to_string(),
            line: idx + 1,
            reason,
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [left, direction, right] = tokens.as_slice() else {
            return Err(malformed(format!(
                "expected `<queue> <direction> <queue>`, found {} token(s)",
                tokens.len()
            )));
        };

        let mut declared = connections.declared();
        let (Some(first), Some(second)) = (declared.next(), declared.next()) else {
            return Err(malformed("queue pairs require two declared connections".to_string()));
        };

        let (left, right) = match (*left == PLACEHOLDER, *right == PLACEHOLDER) {
            (true, true) => return Err(malformed("both queue names are placeholders".to_string())),
            (true, false) => (*right, *right),
            (false, true) => (*left, *left),
            (false, false) => (*left, *right),
        };

        let ((in_conn, in_queue), (out_conn, out_queue)) = match *direction {
            ">" => ((first, left), (second, right)),
            "<" => ((second, right), (first, left)),
            other => return Err(malformed(format!("invalid direction `{}`, expected `>` or `<`", other))),
        };

        pairs.push(QueuePairDescriptor {
            inbound_connection: in_conn.name.clone(),
            inbound_queue: in_queue.to_string(),
            inbound_channel: in_conn.channel.clone(),
            outbound_connection: out_conn.name.clone(),
            outbound_queue: out_queue.to_string(),
            outbound_channel: out_conn.channel.clone(),
        });
    }

    Ok(pairs)
}

/// Trimmed lines that are neither blank nor comments, with their index.
fn significant_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty() && !is_comment(line))
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';') || line.starts_with("//")
}

fn has_connection_prefix(key: &str) -> bool {
    key.split(':')
        .next()
        .is_some_and(|head| head.trim().eq_ignore_ascii_case(CONNECTION_PREFIX))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
