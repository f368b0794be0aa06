//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Pair forwarder error:
//!     → backoff.rs (current delay from the shared schedule)
//!     → wait, interruptible by shutdown
//!     → advance to the next longer delay
//! Successful forward or duplicate skip:
//!     → reset to the shortest delay
//! ```
//!
//! # Design Decisions
//! - One schedule per process, shared read-only across pairs
//! - Retry forever; the ceiling only caps the delay
//! - No jitter: pairs fail and recover independently anyway

pub mod backoff;

pub use backoff::{RetrySchedule, RetryState};
