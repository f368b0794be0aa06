//! mq-bridge
//!
//! Forwards messages between two queue-manager systems during a side-by-side
//! migration, one fixed lane per configured queue pair.
//!
//! # Architecture Overview
//!
//! ```text
//!   appsettings.config ──┐
//!                        ├─▶ config (parse + validate) ──▶ bridge orchestrator
//!   queuepairs.config ───┘                                   │
//!                                                            ├─▶ pair forwarder ─┐
//!   bridge.toml ─────────▶ settings                          ├─▶ pair forwarder ─┤
//!                                                            └─▶ pair forwarder ─┤
//!                                                                                │
//!     inbound QM ◀──── get / commit ──── transport ──── put / commit ────▶ outbound QM
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use mq_bridge::config::BridgeConfig;
use mq_bridge::lifecycle::signals::shutdown_on_signal;
use mq_bridge::lifecycle::startup::{self, SourceOverrides};
use mq_bridge::observability::{logging, metrics};
use mq_bridge::transport::memory::MemoryBroker;
use mq_bridge::transport::QueueTransport;
use mq_bridge::{Bridge, Shutdown};

#[derive(Parser)]
#[command(name = "mq-bridge", version)]
#[command(about = "Exactly-once message forwarding between two queue managers", long_about = None)]
struct Cli {
    /// Runtime settings (TOML).
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Connection properties source (overrides settings).
    #[arg(long)]
    connections: Option<PathBuf>,

    /// Queue pairs source (overrides settings).
    #[arg(long)]
    queue_pairs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration, then list the lanes
    Check {
        /// Print the bound configuration as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the bridge until SIGINT/SIGTERM
    Run {
        #[arg(long, value_enum, default_value_t = TransportKind::Memory)]
        transport: TransportKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportKind {
    /// In-process broker, for smoke testing a configuration
    Memory,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let overrides = SourceOverrides {
        settings: cli.settings,
        connections: cli.connections,
        queue_pairs: cli.queue_pairs,
    };

    let (settings, config) = match startup::load(&overrides) {
        Ok(loaded) => loaded,
        Err(e) => {
            logging::init_logging("info");
            tracing::error!(error = %e, "Configuration rejected, bridge not started");
            return Err(e.into());
        }
    };
    logging::init_logging(&settings.observability.log_level);

    match cli.command {
        Commands::Check { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_lanes(&config);
            }
            Ok(())
        }
        Commands::Run { transport } => {
            tracing::info!("mq-bridge v{} starting", env!("CARGO_PKG_VERSION"));

            if settings.observability.metrics_enabled {
                let addr: SocketAddr = settings.observability.metrics_address.parse()?;
                metrics::init_metrics(addr);
            }

            let transport: Arc<dyn QueueTransport> = match transport {
                TransportKind::Memory => {
                    tracing::warn!("Using the in-process broker; messages do not leave this process");
                    Arc::new(memory_broker(&config))
                }
            };

            let bridge = Bridge::new(&config, transport, &settings)?;
            let shutdown = Shutdown::new();
            let running = tokio::spawn(bridge.run(shutdown.subscribe()));

            shutdown_on_signal(&shutdown).await;
            let report = running.await?;

            tracing::info!(
                forwarded = report.lanes.iter().map(|l| l.stats.forwarded).sum::<u64>(),
                "Shutdown complete"
            );
            Ok(())
        }
    }
}

fn print_lanes(config: &BridgeConfig) {
    println!("{} connection(s), {} queue pair(s)", config.connections.len(), config.queue_pairs.len());
    for pair in &config.queue_pairs {
        let endpoint = |name: &str| {
            config
                .connection(name)
                .map(|c| format!("{} ({})", c.endpoint(), c.queue_manager_name))
                .unwrap_or_default()
        };
        println!(
            "  {}  [{} -> {}]",
            pair,
            endpoint(&pair.inbound_connection),
            endpoint(&pair.outbound_connection)
        );
    }
}

/// Broker with every configured queue defined, so lanes can connect.
fn memory_broker(config: &BridgeConfig) -> MemoryBroker {
    let broker = MemoryBroker::new();
    for pair in &config.queue_pairs {
        let sides = [
            (&pair.inbound_connection, &pair.inbound_queue),
            (&pair.outbound_connection, &pair.outbound_queue),
        ];
        for (conn, queue) in sides {
            if let Some(conn) = config.connection(conn) {
                broker.define_queue(&conn.queue_manager_name, queue);
            }
        }
    }
    broker
}
