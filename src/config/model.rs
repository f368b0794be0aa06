//! Bound configuration model.
//!
//! # Responsibilities
//! - Describe queue-manager connections (one per logical name)
//! - Describe the fixed forwarding lanes between two connections
//! - Resolve connection names case-insensitively
//!
//! # Design Decisions
//! - Built once at startup, never mutated afterwards (no hot reload)
//! - Pairs reference connections by name, they do not own them
//! - Passwords never appear in `Debug` output or serialized dumps

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Default listener port of a queue manager.
pub const DEFAULT_PORT: u16 = 1414;

/// Cipher spec applied when TLS is enabled and none is configured.
pub const DEFAULT_CIPHER_SPEC: &str = "ECDHE_RSA_AES_256_GCM_SHA384";

/// Normalized lookup key for a connection name.
pub fn connection_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Connection parameters for one queue manager.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Logical name as first declared (e.g. `old`, `new`).
    pub name: String,

    /// Queue manager to connect to.
    pub queue_manager_name: String,

    /// Host name or address of the queue manager listener.
    pub host: String,

    /// Listener port.
    pub port: u16,

    /// Server-connection channel.
    pub channel: String,

    /// User id presented on connect.
    pub user_id: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Whether the channel is TLS protected.
    pub use_tls: bool,

    /// Cipher spec, required when `use_tls` is set.
    pub ssl_cipher_spec: String,
}

impl ConnectionDescriptor {
    /// Create a descriptor with the connection defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue_manager_name: String::new(),
            host: String::new(),
            port: DEFAULT_PORT,
            channel: String::new(),
            user_id: String::new(),
            password: String::new(),
            use_tls: true,
            ssl_cipher_spec: DEFAULT_CIPHER_SPEC.to_string(),
        }
    }

    /// `host:port` for log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("name", &self.name)
            .field("queue_manager_name", &self.queue_manager_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("channel", &self.channel)
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .field("use_tls", &self.use_tls)
            .field("ssl_cipher_spec", &self.ssl_cipher_spec)
            .finish()
    }
}

/// One fixed forwarding lane: inbound queue on one connection to
/// outbound queue on another.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueuePairDescriptor {
    pub inbound_connection: String,
    pub inbound_queue: String,
    pub inbound_channel: String,
    pub outbound_connection: String,
    pub outbound_queue: String,
    pub outbound_channel: String,
}

impl fmt::Display for QueuePairDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} > {}:{}",
            self.inbound_connection, self.inbound_queue, self.outbound_connection, self.outbound_queue
        )
    }
}

/// Root of the bound configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BridgeConfig {
    /// Connections keyed by [`connection_key`].
    pub connections: BTreeMap<String, ConnectionDescriptor>,

    /// Forwarding lanes in source order.
    pub queue_pairs: Vec<QueuePairDescriptor>,
}

impl BridgeConfig {
    /// Look up a connection by name, ignoring case.
    pub fn connection(&self, name: &str) -> Option<&ConnectionDescriptor> {
        self.connections.get(&connection_key(name))
    }

    /// Insert a connection under its normalized key.
    pub fn insert_connection(&mut self, descriptor: ConnectionDescriptor) {
        self.connections.insert(connection_key(&descriptor.name), descriptor);
    }
}
