//! End-to-end bridge runs against the in-process broker.

use std::sync::Arc;
use std::time::Duration;

use mq_bridge::config::BridgeSettings;
use mq_bridge::transport::memory::{FaultOp, MemoryBroker};
use mq_bridge::{Bridge, Shutdown};

mod common;
use common::{NEW_QM, OLD_QM};

const LIMIT: Duration = Duration::from_secs(120);

#[tokio::test(start_paused = true)]
async fn test_pairs_forward_concurrently() {
    let config = common::config_with_pairs("ORDERS > .\nINVOICES > BILLING\nREPLIES < .\n");
    let broker = common::broker_for(&config);

    broker.enqueue(OLD_QM, "ORDERS", common::message("o-1"));
    broker.enqueue(OLD_QM, "ORDERS", common::message("o-2"));
    broker.enqueue(OLD_QM, "INVOICES", common::message("i-1"));
    broker.enqueue(NEW_QM, "REPLIES", common::message("r-1"));

    let bridge = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(bridge.run(shutdown.subscribe()));

    common::wait_until(LIMIT, || {
        broker.depth(NEW_QM, "ORDERS") == 2
            && broker.depth(NEW_QM, "BILLING") == 1
            && broker.depth(OLD_QM, "REPLIES") == 1
    })
    .await;
    shutdown.trigger();
    let report = running.await.unwrap();

    assert_eq!(report.lanes.len(), 3);
    assert_eq!(report.aborted, 0);
    assert_eq!(report.lane("old:ORDERS > new:ORDERS").unwrap().forwarded, 2);
    assert_eq!(report.lane("new:REPLIES > old:REPLIES").unwrap().forwarded, 1);
    assert_eq!(broker.depth(OLD_QM, "ORDERS"), 0);
    assert_eq!(broker.depth(NEW_QM, "REPLIES"), 0);
    assert_eq!(broker.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_same_identifier_twice_is_put_once() {
    let config = common::config_with_pairs("ORDERS > .\n");
    let broker = common::broker_for(&config);
    broker.enqueue(OLD_QM, "ORDERS", common::message("dup"));
    broker.enqueue(OLD_QM, "ORDERS", common::message("dup"));
    broker.enqueue(OLD_QM, "ORDERS", common::message("next"));

    let bridge = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(bridge.run(shutdown.subscribe()));

    common::wait_until(LIMIT, || broker.depth(NEW_QM, "ORDERS") == 2 && broker.depth(OLD_QM, "ORDERS") == 0).await;
    shutdown.trigger();
    let report = running.await.unwrap();

    let forwarded: Vec<String> = broker
        .messages(NEW_QM, "ORDERS")
        .iter()
        .map(|m| String::from_utf8_lossy(m.id.as_bytes()).into_owned())
        .collect();
    assert_eq!(forwarded, vec!["dup", "next"]);

    let stats = report.lane("old:ORDERS > new:ORDERS").unwrap();
    assert_eq!(stats.forwarded, 2);
    assert_eq!(stats.duplicates_skipped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_crash_between_commits_redelivers_after_restart() {
    let config = common::config_with_pairs("ORDERS > .\n");
    let broker = common::broker_for(&config);
    broker.enqueue(OLD_QM, "ORDERS", common::message("m-1"));
    // Outbound commit succeeds, inbound commit fails.
    broker.fail_next(OLD_QM, FaultOp::Commit, 1);

    let first = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(first.run(shutdown.subscribe()));
    common::wait_until(LIMIT, || broker.depth(NEW_QM, "ORDERS") == 1).await;

    // Stop before the retry, as if the process had died.
    shutdown.trigger();
    running.await.unwrap();
    assert_eq!(broker.depth(OLD_QM, "ORDERS"), 1);

    // A new process starts with an empty dedup state.
    let second = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(second.run(shutdown.subscribe()));
    common::wait_until(LIMIT, || broker.depth(OLD_QM, "ORDERS") == 0).await;
    shutdown.trigger();
    running.await.unwrap();

    let ids: Vec<Vec<u8>> = broker
        .messages(NEW_QM, "ORDERS")
        .iter()
        .map(|m| m.id.as_bytes().to_vec())
        .collect();
    assert_eq!(ids, vec![b"m-1".to_vec(), b"m-1".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn test_crash_between_commits_within_process_is_deduplicated() {
    let config = common::config_with_pairs("ORDERS > .\n");
    let broker = common::broker_for(&config);
    broker.enqueue(OLD_QM, "ORDERS", common::message("m-1"));
    broker.fail_next(OLD_QM, FaultOp::Commit, 1);

    let bridge = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(bridge.run(shutdown.subscribe()));

    common::wait_until(LIMIT, || broker.depth(OLD_QM, "ORDERS") == 0 && broker.connect_count(OLD_QM) == 2).await;
    shutdown.trigger();
    let report = running.await.unwrap();

    assert_eq!(broker.depth(NEW_QM, "ORDERS"), 1);
    let stats = report.lane("old:ORDERS > new:ORDERS").unwrap();
    assert_eq!(stats.duplicates_skipped, 1);
    assert_eq!(stats.failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_outage_is_retried_until_recovery() {
    let config = common::config_with_pairs("ORDERS > .\n");
    let broker = common::broker_for(&config);
    broker.set_available(NEW_QM, false);
    broker.enqueue(OLD_QM, "ORDERS", common::message("m-1"));

    let bridge = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(bridge.run(shutdown.subscribe()));

    // 5s + 7.03s + 14.06s + 28.12s of failed attempts.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(broker.depth(NEW_QM, "ORDERS"), 0);
    assert_eq!(broker.depth(OLD_QM, "ORDERS"), 1);

    broker.set_available(NEW_QM, true);
    common::wait_until(Duration::from_secs(300), || broker.depth(NEW_QM, "ORDERS") == 1).await;
    shutdown.trigger();
    let report = running.await.unwrap();

    let stats = report.lane("old:ORDERS > new:ORDERS").unwrap();
    assert!(stats.failures >= 4);
    assert_eq!(stats.forwarded, 1);
    assert_eq!(broker.depth(OLD_QM, "ORDERS"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_pair_does_not_block_others() {
    let config = common::config_with_pairs("ORDERS > .\nINVOICES > BILLING\n");
    let broker = common::broker_for(&config);
    broker.enqueue(OLD_QM, "ORDERS", common::message("o-1"));
    broker.enqueue(OLD_QM, "INVOICES", common::message("i-1"));
    // One put on the new side fails; only the pair that hits it backs off.
    broker.fail_next(NEW_QM, FaultOp::Put, 1);

    let bridge = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(bridge.run(shutdown.subscribe()));

    common::wait_until(LIMIT, || {
        broker.depth(NEW_QM, "ORDERS") == 1 && broker.depth(NEW_QM, "BILLING") == 1
    })
    .await;
    shutdown.trigger();
    let report = running.await.unwrap();

    let failures: u64 = report.lanes.iter().map(|l| l.stats.failures).sum();
    let forwarded: u64 = report.lanes.iter().map(|l| l.stats.forwarded).sum();
    assert_eq!(failures, 1);
    assert_eq!(forwarded, 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_queue_isolated_to_its_pair() {
    let config = common::config_with_pairs("ORDERS > .\nINVOICES > BILLING\n");
    // BILLING is not defined on the new side yet.
    let broker = MemoryBroker::new();
    broker.define_queue(OLD_QM, "ORDERS");
    broker.define_queue(NEW_QM, "ORDERS");
    broker.define_queue(OLD_QM, "INVOICES");
    broker.enqueue(OLD_QM, "ORDERS", common::message("o-1"));
    broker.enqueue(OLD_QM, "INVOICES", common::message("i-1"));

    let bridge = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(bridge.run(shutdown.subscribe()));

    common::wait_until(LIMIT, || broker.depth(NEW_QM, "ORDERS") == 1).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(broker.depth(OLD_QM, "INVOICES"), 1);

    broker.define_queue(NEW_QM, "BILLING");
    common::wait_until(Duration::from_secs(300), || broker.depth(NEW_QM, "BILLING") == 1).await;
    shutdown.trigger();
    let report = running.await.unwrap();

    let orders = report.lane("old:ORDERS > new:ORDERS").unwrap();
    let invoices = report.lane("old:INVOICES > new:BILLING").unwrap();
    assert_eq!(orders.failures, 0);
    assert_eq!(orders.forwarded, 1);
    assert!(invoices.failures >= 2);
    assert_eq!(invoices.forwarded, 1);
}

#[tokio::test]
async fn test_shutdown_stops_idle_pairs_promptly() {
    let config = common::config_with_pairs("ORDERS > .\nINVOICES > BILLING\nREPLIES < .\n");
    let broker = common::broker_for(&config);

    let bridge = Bridge::new(&config, Arc::new(broker.clone()), &BridgeSettings::default()).unwrap();
    let shutdown = Shutdown::new();
    let running = tokio::spawn(bridge.run(shutdown.subscribe()));

    common::wait_until(Duration::from_secs(5), || broker.open_sessions() == 6).await;
    shutdown.trigger();

    let report = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("bridge stopped before the receive wait elapsed")
        .unwrap();
    assert_eq!(report.lanes.len(), 3);
    assert_eq!(report.aborted, 0);
    assert!(report.lanes.iter().all(|l| l.stats.failures == 0));
    assert_eq!(broker.open_sessions(), 0);
}
