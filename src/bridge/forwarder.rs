//! Exactly-once forwarding for one queue pair.
//!
//! # Protocol
//! ```text
//! get (syncpoint, inbound)
//!   id == last forwarded → commit inbound only            (duplicate)
//!   otherwise            → put (syncpoint, outbound)
//!                          commit outbound
//!                          remember id
//!                          commit inbound                 (forwarded)
//! any failure            → back out both sides, wait, reconnect
//! ```
//!
//! The outbound commit always precedes the inbound commit. A failure between
//! the two leaves the message on both queues; the redelivery is recognized by
//! its identifier and removed without a second put.
//!
//! # Design Decisions
//! - One message at a time; the next get waits for the current disposition
//! - Fresh sessions on every reconnect, never shared with other pairs
//! - Shutdown interrupts the receive wait and the backoff delay, never a commit

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::bridge::state::{DedupState, ForwarderState, PairStats};
use crate::config::model::{BridgeConfig, QueuePairDescriptor};
use crate::config::schema::BridgeSettings;
use crate::config::validation::ValidationError;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::resilience::backoff::{RetrySchedule, RetryState};
use crate::transport::{
    AccessMode, ConnectionParams, GetOptions, Message, PutOptions, QueueHandle, QueueTransport, Received, Session,
    TransportError,
};

/// Per-pair runtime options.
#[derive(Debug, Clone)]
pub struct ForwarderOptions {
    /// Shortest blocking receive.
    pub wait_min: Duration,
    /// Longest blocking receive.
    pub wait_max: Duration,
    /// Application name reported on connect.
    pub application_name: String,
}

impl ForwarderOptions {
    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self {
            wait_min: settings.receive.wait_min(),
            wait_max: settings.receive.wait_max(),
            application_name: settings.client.application_name.clone(),
        }
    }

    /// Receive wait for one attempt, uniform in `[wait_min, wait_max]`.
    fn receive_wait(&self) -> Duration {
        let min = u64::try_from(self.wait_min.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.wait_max.as_millis()).unwrap_or(u64::MAX);
        if max <= min {
            return self.wait_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for ForwarderOptions {
    fn default() -> Self {
        Self::from_settings(&BridgeSettings::default())
    }
}

/// What happened to one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Forwarded,
    Skipped,
}

/// Open sessions and queues of one connection attempt.
struct Lane {
    inbound: Box<dyn Session>,
    inbound_queue: Box<dyn QueueHandle>,
    outbound: Box<dyn Session>,
    outbound_queue: Box<dyn QueueHandle>,
}

impl Lane {
    /// Best-effort backout of both sides. Broken sessions are skipped.
    async fn rollback(&mut self) {
        for session in [&mut self.inbound, &mut self.outbound] {
            if session.is_connected() {
                if let Err(e) = session.backout().await {
                    tracing::debug!(error = %e, "Backout failed");
                }
            }
        }
    }

    async fn close(mut self) {
        self.inbound.disconnect().await;
        self.outbound.disconnect().await;
    }
}

/// State machine forwarding one queue pair until shutdown.
pub struct PairForwarder {
    lane: String,
    pair: QueuePairDescriptor,
    inbound: ConnectionParams,
    outbound: ConnectionParams,
    transport: Arc<dyn QueueTransport>,
    schedule: Arc<RetrySchedule>,
    options: ForwarderOptions,
    state: ForwarderState,
    dedup: DedupState,
    retry: RetryState,
    stats: PairStats,
}

impl PairForwarder {
    /// Build a forwarder for `pair`, resolving both connections in `config`.
    pub fn new(
        pair: QueuePairDescriptor,
        config: &BridgeConfig,
        transport: Arc<dyn QueueTransport>,
        schedule: Arc<RetrySchedule>,
        options: ForwarderOptions,
    ) -> Result<Self, ValidationError> {
        let resolve = |name: &str| {
            config.connection(name).ok_or_else(|| ValidationError::MissingConnections {
                names: vec![name.to_string()],
            })
        };
        let inbound = ConnectionParams::from_descriptor(
            resolve(&pair.inbound_connection)?,
            &pair.inbound_channel,
            &options.application_name,
        );
        let outbound = ConnectionParams::from_descriptor(
            resolve(&pair.outbound_connection)?,
            &pair.outbound_channel,
            &options.application_name,
        );

        Ok(Self {
            lane: pair.to_string(),
            pair,
            inbound,
            outbound,
            transport,
            schedule,
            options,
            state: ForwarderState::Disconnected,
            dedup: DedupState::new(),
            retry: RetryState::new(),
            stats: PairStats::default(),
        })
    }

    /// Lane label used in logs and metrics.
    pub fn lane(&self) -> &str {
        &self.lane
    }

    /// Run until `shutdown` is triggered. Returns the pair's counters.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> PairStats {
        let queues = if self.pair.inbound_queue == self.pair.outbound_queue {
            self.pair.inbound_queue.clone()
        } else {
            format!("{} > {}", self.pair.inbound_queue, self.pair.outbound_queue)
        };
        tracing::info!(
            "{} > {}: {}",
            self.inbound.endpoint(),
            self.outbound.endpoint(),
            queues
        );

        while !shutdown.is_triggered() {
            self.transition(ForwarderState::Connecting);
            let mut lane = match self.connect().await {
                Ok(lane) => lane,
                Err(e) => {
                    self.back_off(&e, &mut shutdown).await;
                    continue;
                }
            };
            self.stats.connects += 1;
            self.transition(ForwarderState::Idle);

            let outcome = self.serve(&mut lane, &mut shutdown).await;
            if outcome.is_err() {
                lane.rollback().await;
            }
            lane.close().await;

            match outcome {
                Ok(()) => break,
                Err(e) => self.back_off(&e, &mut shutdown).await,
            }
        }

        self.transition(ForwarderState::Disconnected);
        tracing::info!(
            forwarded = self.stats.forwarded,
            duplicates_skipped = self.stats.duplicates_skipped,
            failures = self.stats.failures,
            "Pair stopped"
        );
        self.stats
    }

    /// Open both sessions and queues.
    async fn connect(&mut self) -> Result<Lane, TransportError> {
        let mut inbound = self.transport.connect(&self.inbound).await?;
        let mut outbound = match self.transport.connect(&self.outbound).await {
            Ok(session) => session,
            Err(e) => {
                inbound.disconnect().await;
                return Err(e);
            }
        };

        let opened = async {
            let inbound_queue = inbound.access_queue(&self.pair.inbound_queue, AccessMode::Input).await?;
            let outbound_queue = outbound.access_queue(&self.pair.outbound_queue, AccessMode::Output).await?;
            Ok::<_, TransportError>((inbound_queue, outbound_queue))
        }
        .await;

        match opened {
            Ok((inbound_queue, outbound_queue)) => {
                tracing::debug!(
                    inbound_queue_manager = %self.inbound.queue_manager,
                    outbound_queue_manager = %self.outbound.queue_manager,
                    "Connected"
                );
                Ok(Lane {
                    inbound,
                    inbound_queue,
                    outbound,
                    outbound_queue,
                })
            }
            Err(e) => {
                inbound.disconnect().await;
                outbound.disconnect().await;
                Err(e)
            }
        }
    }

    /// Receive and dispose messages until shutdown (`Ok`) or a failure (`Err`).
    async fn serve(&mut self, lane: &mut Lane, shutdown: &mut ShutdownSignal) -> Result<(), TransportError> {
        loop {
            if shutdown.is_triggered() {
                return Ok(());
            }

            let options = GetOptions::syncpoint(self.options.receive_wait());
            tracing::debug!(
                queue = lane.inbound_queue.queue_name(),
                wait_ms = options.wait.map(|w| u64::try_from(w.as_millis()).unwrap_or(u64::MAX)),
                "Getting message"
            );

            let received = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    // The get may have been dropped mid-wait; leave nothing open.
                    if lane.inbound.is_connected() {
                        if let Err(e) = lane.inbound.backout().await {
                            tracing::debug!(error = %e, "Backout failed");
                        }
                    }
                    return Ok(());
                }
                received = lane.inbound_queue.get(options) => received?,
            };

            match received {
                Received::Empty => {
                    self.stats.empty_polls += 1;
                    tracing::debug!(queue = %self.pair.inbound_queue, "No message available");
                }
                Received::Message(message) => {
                    self.transition(ForwarderState::Forwarding);
                    match self.dispose(lane, &message).await? {
                        Disposition::Forwarded => {
                            self.stats.forwarded += 1;
                            metrics::record_forwarded(&self.lane);
                        }
                        Disposition::Skipped => {
                            self.stats.duplicates_skipped += 1;
                            metrics::record_duplicate(&self.lane);
                        }
                    }
                    self.retry.reset();
                    self.transition(ForwarderState::Idle);
                }
            }
        }
    }

    /// Forward one message, or drop it as a duplicate.
    async fn dispose(&mut self, lane: &mut Lane, message: &Message) -> Result<Disposition, TransportError> {
        if self.dedup.is_duplicate(&message.id) {
            lane.inbound.commit().await?;
            tracing::info!(message_id = %message.id, "Skipping duplicate message");
            return Ok(Disposition::Skipped);
        }

        lane.outbound_queue.put(message, PutOptions::syncpoint()).await?;
        lane.outbound.commit().await?;
        self.dedup.remember(message.id.clone());

        lane.inbound.commit().await?;
        tracing::info!(
            message_id = %message.id,
            correlation_id = %message.correlation_id,
            outbound_queue = lane.outbound_queue.queue_name(),
            "Forwarded message"
        );
        Ok(Disposition::Forwarded)
    }

    /// Log the failure, wait the current delay, then step the schedule.
    async fn back_off(&mut self, error: &TransportError, shutdown: &mut ShutdownSignal) {
        self.transition(ForwarderState::ErrorBackoff);
        self.stats.failures += 1;
        metrics::record_error(&self.lane);

        let delay = self.retry.current(&self.schedule);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        metrics::record_retry_delay(&self.lane, delay_ms);

        if self.retry.is_at_ceiling(&self.schedule) {
            tracing::error!(error = %error, delay_ms, "Error processing pair");
        } else {
            tracing::warn!(error = %error, delay_ms, "Error processing pair, will retry");
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.triggered() => {}
        }

        self.retry.advance(&self.schedule);
        self.transition(ForwarderState::Disconnected);
    }

    fn transition(&mut self, next: ForwarderState) {
        if self.state != next {
            tracing::trace!(from = %self.state, to = %next, "State change");
            self.state = next;
        }
    }
}
