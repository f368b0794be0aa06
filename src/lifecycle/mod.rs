//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load settings → Parse sources → Validate → Start bridge
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Pairs reach a safe boundary → Disconnect → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: no pair starts unless the whole configuration is valid
//! - Shutdown never interrupts a unit of work between its commits

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
