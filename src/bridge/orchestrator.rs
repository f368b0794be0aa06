//! Bridge orchestration: one forwarder per configured pair.
//!
//! # Responsibilities
//! - Gate startup on a valid configuration
//! - Spawn one independent task per queue pair
//! - Wait for every pair to reach a safe boundary on shutdown
//!
//! # Design Decisions
//! - Pairs share only the retry schedule and the shutdown signal
//! - A failing or panicking pair never stops the others

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::bridge::forwarder::{ForwarderOptions, PairForwarder};
use crate::bridge::state::PairStats;
use crate::config::model::BridgeConfig;
use crate::config::schema::BridgeSettings;
use crate::config::validation::{validate_config, ValidationError};
use crate::lifecycle::ShutdownSignal;
use crate::resilience::backoff::RetrySchedule;
use crate::transport::QueueTransport;

/// Outcome of one pair task.
#[derive(Debug, Clone, Serialize)]
pub struct LaneReport {
    pub lane: String,
    pub stats: PairStats,
}

/// Outcome of a bridge run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BridgeReport {
    /// Pairs that stopped cleanly, in completion order.
    pub lanes: Vec<LaneReport>,
    /// Pair tasks that terminated abnormally.
    pub aborted: usize,
}

impl BridgeReport {
    pub fn lane(&self, lane: &str) -> Option<&PairStats> {
        self.lanes.iter().find(|r| r.lane == lane).map(|r| &r.stats)
    }
}

/// Runs every configured queue pair concurrently.
pub struct Bridge {
    forwarders: Vec<PairForwarder>,
    schedule: Arc<RetrySchedule>,
}

impl Bridge {
    /// Validate `config` and prepare one forwarder per pair.
    pub fn new(
        config: &BridgeConfig,
        transport: Arc<dyn QueueTransport>,
        settings: &BridgeSettings,
    ) -> Result<Self, ValidationError> {
        validate_config(config)?;

        let schedule = Arc::new(RetrySchedule::new(settings.retry.floor_secs, settings.retry.ceiling_secs));
        let options = ForwarderOptions::from_settings(settings);

        let forwarders = config
            .queue_pairs
            .iter()
            .map(|pair| {
                PairForwarder::new(
                    pair.clone(),
                    config,
                    transport.clone(),
                    schedule.clone(),
                    options.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { forwarders, schedule })
    }

    pub fn pair_count(&self) -> usize {
        self.forwarders.len()
    }

    pub fn schedule(&self) -> &RetrySchedule {
        &self.schedule
    }

    /// Run all pairs until `shutdown` fires and every pair has stopped.
    pub async fn run(self, shutdown: ShutdownSignal) -> BridgeReport {
        tracing::info!(
            pairs = self.forwarders.len(),
            retry_delays_ms = ?self.schedule.delays_ms(),
            "Bridge starting"
        );

        let mut tasks = JoinSet::new();
        for forwarder in self.forwarders {
            let lane = forwarder.lane().to_string();
            let span = tracing::info_span!("pair", lane = %lane);
            let signal = shutdown.clone();
            tasks.spawn(
                async move {
                    let stats = forwarder.run(signal).await;
                    LaneReport { lane, stats }
                }
                .instrument(span),
            );
        }

        let mut report = BridgeReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(lane) => report.lanes.push(lane),
                Err(e) => {
                    report.aborted += 1;
                    tracing::error!(error = %e, "Pair task terminated abnormally");
                }
            }
        }

        tracing::info!(
            stopped = report.lanes.len(),
            aborted = report.aborted,
            "Bridge stopped"
        );
        report
    }
}
