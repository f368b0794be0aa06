//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! appsettings.config + queuepairs.config
//!     → parser.rs (line-oriented parsing, placeholder resolution)
//!     → validation.rs (referential integrity)
//!     → BridgeConfig (validated, immutable)
//!     → shared via Arc with every pair forwarder
//!
//! bridge.toml (optional)
//!     → loader.rs (deserialize)
//!     → validation.rs (value ranges)
//!     → BridgeSettings
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - Any load error is fatal: no forwarding task starts on a bad config
//! - All settings fields have defaults to allow minimal settings files

pub mod loader;
pub mod model;
pub mod parser;
pub mod schema;
pub mod validation;

pub use model::{BridgeConfig, ConnectionDescriptor, QueuePairDescriptor};
pub use schema::BridgeSettings;
