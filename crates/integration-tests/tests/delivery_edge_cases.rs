//! Edge cases at the producer/consumer boundary

use std::sync::Arc;
use std::time::Duration;

use mlb_stats_core::application::{shutdown_channel, Dispatcher, Producer};
use mlb_stats_core::domain::{League, TextCodec};
use mlb_stats_core::error::AppError;
use mlb_stats_core::port::alert_sink::mocks::RecordingAlertSink;
use mlb_stats_core::port::durable_queue::mocks::InMemoryQueue;
use mlb_stats_core::port::stat_source::mocks::VecSource;
use mlb_stats_core::port::{DurableQueue, SourceRow};
use mlb_stats_infra_csv::CsvStatSource;

const NL: &str = "national-league";
const AL: &str = "american-league";

/// Blank stat cells are skipped; BOM and padded headers are tolerated
#[tokio::test]
async fn test_blank_cells_and_bom_header() {
    let csv = "\u{feff} Player , Team ,AVG,HR,RBI\n\
               Aaron Judge,NYY,0.322,37,\n\
               Mookie Betts,LAD,0.307,19,75\n";
    let mut source = CsvStatSource::from_reader(csv.as_bytes()).unwrap();
    let queue = InMemoryQueue::new();
    let producer = Producer::new(Arc::new(queue.clone()), Arc::new(TextCodec::new()));

    let report = producer.run(&mut source).await.unwrap();
    assert_eq!(report.skipped_blank, 1);
    assert_eq!(report.published, 1);
    assert_eq!(
        queue.published(NL),
        vec!["Player: Mookie Betts, avg: 0.307, hr: 19, rbi: 75"]
    );
}

/// Broker down before the batch starts: nothing is published and the run fails
#[tokio::test]
async fn test_producer_fails_when_broker_unavailable() {
    let queue = InMemoryQueue::new();
    queue.disconnect();
    let producer = Producer::new(Arc::new(queue.clone()), Arc::new(TextCodec::new()));
    let mut source = VecSource::new(vec![SourceRow::new("Mike Trout", "LAA", "0.300", "15", "40")]);

    let err = producer.run(&mut source).await.unwrap_err();
    assert!(err.is_connection_fatal());
}

/// A conflicting non-durable declaration surfaces as a conflict
#[tokio::test]
async fn test_producer_reports_declaration_conflict() {
    let queue = InMemoryQueue::new();
    queue.declare_queue(NL, false).await.unwrap();
    let producer = Producer::new(Arc::new(queue.clone()), Arc::new(TextCodec::new()));
    let mut source = VecSource::new(vec![]);

    let err = producer.run(&mut source).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

/// Garbage and latin-1 payloads are handled without stopping consumption
#[tokio::test]
async fn test_consumer_survives_bad_payloads() {
    let queue = InMemoryQueue::new();
    queue.declare_queue(NL, true).await.unwrap();
    queue.declare_queue(AL, true).await.unwrap();

    queue.publish(NL, b"not a stat line").await.unwrap();
    // "José" in latin-1
    queue
        .publish(NL, b"Player: Jos\xe9 Ramirez, avg: 0.310, hr: 28, rbi: 90")
        .await
        .unwrap();
    queue
        .publish(NL, b"Player: Late Bloomer, avg: 0.281, hr: 11, rbi: 31")
        .await
        .unwrap();

    let sink = Arc::new(RecordingAlertSink::new());
    let dispatcher = Dispatcher::new(Arc::new(queue.clone()), Arc::new(TextCodec::new()), sink.clone());
    let (shutdown, token) = shutdown_channel();
    let handle = tokio::spawn(async move { dispatcher.run(&[League::National], token).await });

    tokio::time::timeout(Duration::from_secs(5), async {
        while queue.acked(NL).len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("deliveries were not acknowledged in time");
    shutdown.shutdown();

    let report = handle.await.unwrap().unwrap();
    let stats = report.stats_for(League::National).unwrap();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.discarded, 1);
    assert_eq!(stats.alerts, 2);

    let players: Vec<String> = sink.alerts().into_iter().map(|a| a.player).collect();
    assert_eq!(players, vec!["José Ramirez", "Late Bloomer"]);
    // only the requested queue was consumed
    assert!(report.stats_for(League::American).is_none());
}

/// Broker loss while consuming ends the run with a connection error
#[tokio::test]
async fn test_consumer_stops_on_connection_loss() {
    let queue = InMemoryQueue::new();
    let dispatcher = Dispatcher::new(
        Arc::new(queue.clone()),
        Arc::new(TextCodec::new()),
        Arc::new(RecordingAlertSink::new()),
    );
    let (_shutdown, token) = shutdown_channel();
    let handle = tokio::spawn(async move { dispatcher.run(&League::ALL, token).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.disconnect();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
    assert!(result.unwrap_err().is_connection_fatal());
}
