//! Queue-transport capability surface.
//!
//! # Responsibilities
//! - Define what the bridge needs from a queue-manager client
//! - Model "no message available" as a normal receive outcome
//! - Carry connection parameters without leaking credentials into logs
//!
//! # Operations
//! ```text
//! QueueTransport::connect(params)        → Session
//! Session::access_queue(name, mode)      → QueueHandle
//! QueueHandle::get(wait, syncpoint)      → Received::{Message, Empty}
//! QueueHandle::put(message, syncpoint)
//! Session::commit() / Session::backout()
//! ```
//!
//! # Design Decisions
//! - Object-safe async traits so one forwarder type serves every client
//! - Each session owns its unit of work; handles never outlive their session's use
//! - Message payloads are opaque and never formatted

pub mod memory;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::model::ConnectionDescriptor;

/// Opaque message identifier, compared byte for byte.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct MessageId(Vec<u8>);

impl MessageId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self)
    }
}

/// A message moved by the bridge.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub correlation_id: MessageId,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(id: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: MessageId::new(id),
            correlation_id: MessageId::default(),
            payload: payload.into(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<Vec<u8>>) -> Self {
        self.correlation_id = MessageId::new(correlation_id);
        self
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("correlation_id", &self.correlation_id)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Outcome of a receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message(Message),
    /// Nothing arrived within the wait interval.
    Empty,
}

/// How a queue is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Destructive gets, shared input.
    Input,
    /// Puts.
    Output,
}

/// Receive options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// How long to block; `None` returns immediately.
    pub wait: Option<Duration>,
    /// Get inside the session's unit of work.
    pub syncpoint: bool,
}

impl GetOptions {
    /// Blocking get under syncpoint.
    pub fn syncpoint(wait: Duration) -> Self {
        Self {
            wait: Some(wait),
            syncpoint: true,
        }
    }
}

/// Send options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    /// Put inside the session's unit of work.
    pub syncpoint: bool,
}

impl PutOptions {
    pub fn syncpoint() -> Self {
        Self { syncpoint: true }
    }
}

/// Everything a client needs to open a session.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub queue_manager: String,
    pub host: String,
    pub port: u16,
    pub channel: String,
    pub user_id: String,
    pub password: String,
    /// Cipher spec when the channel is TLS protected.
    pub cipher_spec: Option<String>,
    pub application_name: String,
}

impl ConnectionParams {
    /// Parameters for one side of a pair, using that side's resolved channel.
    pub fn from_descriptor(conn: &ConnectionDescriptor, channel: &str, application_name: &str) -> Self {
        Self {
            queue_manager: conn.queue_manager_name.clone(),
            host: conn.host.clone(),
            port: conn.port,
            channel: channel.to_string(),
            user_id: conn.user_id.clone(),
            password: conn.password.clone(),
            cipher_spec: conn.use_tls.then(|| conn.ssl_cipher_spec.clone()),
            application_name: application_name.to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("queue_manager", &self.queue_manager)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("channel", &self.channel)
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .field("cipher_spec", &self.cipher_spec)
            .field("application_name", &self.application_name)
            .finish()
    }
}

/// Failures reported by a transport. All are recoverable per pair.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect to {queue_manager} failed: {reason}")]
    Connect { queue_manager: String, reason: String },

    #[error("cannot open queue {queue}: {reason}")]
    Access { queue: String, reason: String },

    #[error("get from {queue} failed: {reason}")]
    Get { queue: String, reason: String },

    #[error("put to {queue} failed: {reason}")]
    Put { queue: String, reason: String },

    #[error("commit on {queue_manager} failed: {reason}")]
    Commit { queue_manager: String, reason: String },

    #[error("backout on {queue_manager} failed: {reason}")]
    Backout { queue_manager: String, reason: String },

    #[error("connection to {queue_manager} is broken")]
    ConnectionBroken { queue_manager: String },
}

/// Factory for sessions to a queue manager.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Session>, TransportError>;
}

/// One connection to a queue manager with its unit of work.
#[async_trait]
pub trait Session: Send {
    async fn access_queue(&mut self, queue: &str, mode: AccessMode) -> Result<Box<dyn QueueHandle>, TransportError>;

    /// Commit everything done under syncpoint since the last commit or backout.
    async fn commit(&mut self) -> Result<(), TransportError>;

    /// Roll back the open unit of work.
    async fn backout(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Close the session; an open unit of work is rolled back.
    async fn disconnect(&mut self);
}

/// An opened queue.
#[async_trait]
pub trait QueueHandle: Send {
    fn queue_name(&self) -> &str;

    async fn get(&mut self, options: GetOptions) -> Result<Received, TransportError>;

    async fn put(&mut self, message: &Message, options: PutOptions) -> Result<(), TransportError>;
}
