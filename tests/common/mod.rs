//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use mq_bridge::config::parser::parse_bridge_config;
use mq_bridge::config::BridgeConfig;
use mq_bridge::transport::memory::MemoryBroker;
use mq_bridge::transport::Message;
use tempfile::NamedTempFile;

pub const OLD_QM: &str = "QM_OLD";
pub const NEW_QM: &str = "QM_NEW";

const CONNECTIONS: &str = "\
ibmmq:old:queuemanagername=QM_OLD
ibmmq:old:host=localhost
ibmmq:old:port=1414
ibmmq:old:channel=DEV.APP.SVRCONN
ibmmq:old:usetls=false
ibmmq:new:queuemanagername=QM_NEW
ibmmq:new:host=localhost
ibmmq:new:port=1415
ibmmq:new:channel=DEV.APP.SVRCONN
ibmmq:new:usetls=false
";

/// Bridge configuration over the `old`/`new` test connections.
pub fn config_with_pairs(pairs: &str) -> BridgeConfig {
    parse_bridge_config(CONNECTIONS, "connections", pairs, "pairs").expect("test configuration parses")
}

/// Broker with every queue of `config` defined.
pub fn broker_for(config: &BridgeConfig) -> MemoryBroker {
    let broker = MemoryBroker::new();
    for pair in &config.queue_pairs {
        let inbound = config.connection(&pair.inbound_connection).unwrap();
        let outbound = config.connection(&pair.outbound_connection).unwrap();
        broker.define_queue(&inbound.queue_manager_name, &pair.inbound_queue);
        broker.define_queue(&outbound.queue_manager_name, &pair.outbound_queue);
    }
    broker
}

pub fn message(id: &str) -> Message {
    Message::new(id.as_bytes().to_vec(), format!("payload of {}", id).into_bytes())
}

/// Poll `done` every 100ms until it holds; panics after `limit`.
pub async fn wait_until<F>(limit: Duration, done: F)
where
    F: Fn() -> bool,
{
    let step = Duration::from_millis(100);
    let mut waited = Duration::ZERO;
    while !done() {
        if waited >= limit {
            panic!("condition not reached within {:?}", limit);
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
}

/// Path of a file shipped in the repository's `config/` directory.
pub fn sample_config(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config").join(name)
}

/// Write `content` to a temporary file removed when the handle drops.
pub fn temp_file(name: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix(name)
        .tempfile()
        .expect("create temporary file");
    file.write_all(content.as_bytes()).expect("write temporary file");
    file
}
