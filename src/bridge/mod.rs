//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! BridgeConfig (validated)
//!     → orchestrator.rs (one task per queue pair)
//!     → forwarder.rs (get → put → commit outbound → commit inbound)
//!     → state.rs (dedup identifier, counters)
//! ```

pub mod forwarder;
pub mod orchestrator;
pub mod state;

pub use forwarder::{ForwarderOptions, PairForwarder};
pub use orchestrator::{Bridge, BridgeReport, LaneReport};
pub use state::{DedupState, ForwarderState, PairStats};
