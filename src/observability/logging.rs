//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate; every pair logs inside its own span
//! - `RUST_LOG` wins over the configured level
//! - Only identifiers, queue names and timings are logged, never payloads

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mq_bridge={}", default_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
