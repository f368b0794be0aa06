//! Exactly-once bridge between two message-queue systems.

pub mod bridge;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use bridge::Bridge;
pub use config::{BridgeConfig, BridgeSettings};
pub use lifecycle::Shutdown;
