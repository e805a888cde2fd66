// Producer - partitions source rows into league queues

use crate::application::dispatcher::constants::QUEUE_DURABLE;
use crate::domain::{route, League, MessageCodec, StatRecord};
use crate::error::{AppError, Result};
use crate::port::{DurableQueue, SourceRow, StatSource};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-run counters, logged when the batch completes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub rows_read: u64,
    pub published: u64,
    pub unrouted: u64,
    pub skipped_blank: u64,
    pub skipped_invalid: u64,
    pub unreadable: u64,
    pub publish_failures: u64,
}

/// Why a routed row did not become a StatRecord
#[derive(Debug, PartialEq)]
enum RowRejection {
    Blank(&'static str),
    InvalidNumber { field: &'static str, value: String },
}

/// Reads rows in order, routes, encodes and publishes them.
/// Holds one queue connection for the whole batch.
pub struct Producer {
    queue: Arc<dyn DurableQueue>,
    codec: Arc<dyn MessageCodec>,
}

impl Producer {
    pub fn new(queue: Arc<dyn DurableQueue>, codec: Arc<dyn MessageCodec>) -> Self {
        Self { queue, codec }
    }

    /// Publish every routable row of `source`.
    ///
    /// Bad rows are skipped and counted. Returns `Err` only for setup
    /// failures (queue declaration), source I/O failures and connection loss.
    pub async fn run(&self, source: &mut dyn StatSource) -> Result<ProducerReport> {
        for league in League::ALL {
            self.queue
                .declare_queue(league.queue_name(), QUEUE_DURABLE)
                .await?;
        }

        let mut report = ProducerReport::default();
        while let Some(next) = source.next_row() {
            report.rows_read += 1;

            let row = match next {
                Ok(row) => row,
                Err(AppError::Io(e)) => {
                    error!(error = %e, "Source read failed");
                    return Err(AppError::Io(e));
                }
                Err(e) => {
                    warn!(row = report.rows_read, error = %e, "Skipping unreadable source row");
                    report.unreadable += 1;
                    continue;
                }
            };

            let league = match route(&row.team) {
                Ok(league) => league,
                Err(e) => {
                    warn!(line = row.line, player = %row.player, "{}", e);
                    report.unrouted += 1;
                    continue;
                }
            };

            let record = match record_from_row(&row) {
                Ok(record) => record,
                Err(RowRejection::Blank(field)) => {
                    debug!(line = row.line, player = %row.player, field, "Skipping row with blank field");
                    report.skipped_blank += 1;
                    continue;
                }
                Err(RowRejection::InvalidNumber { field, value }) => {
                    warn!(line = row.line, player = %row.player, field, value = %value, "Skipping row with non-numeric value");
                    report.skipped_invalid += 1;
                    continue;
                }
            };

            let payload = self.codec.encode(&record);
            match self.queue.publish(league.queue_name(), &payload).await {
                Ok(()) => {
                    info!(
                        queue = league.queue_name(),
                        message = %String::from_utf8_lossy(&payload),
                        "Sent message"
                    );
                    report.published += 1;
                }
                Err(e) if e.is_connection_fatal() => {
                    error!(queue = league.queue_name(), error = %e, "Connection lost while publishing");
                    return Err(e);
                }
                Err(e) => {
                    error!(queue = league.queue_name(), player = %record.player(), error = %e, "Error sending message");
                    report.publish_failures += 1;
                }
            }
        }

        info!(
            rows_read = report.rows_read,
            published = report.published,
            unrouted = report.unrouted,
            skipped_blank = report.skipped_blank,
            skipped_invalid = report.skipped_invalid,
            unreadable = report.unreadable,
            publish_failures = report.publish_failures,
            "Producer batch complete"
        );
        Ok(report)
    }
}

fn record_from_row(row: &SourceRow) -> std::result::Result<StatRecord, RowRejection> {
    let fields = [
        ("Player", row.player.trim()),
        ("AVG", row.avg.trim()),
        ("HR", row.hr.trim()),
        ("RBI", row.rbi.trim()),
    ];
    if let Some(&(field, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
        return Err(RowRejection::Blank(field));
    }

    let avg = parse_number::<f64>("AVG", &row.avg)?;
    if !avg.is_finite() {
        return Err(invalid("AVG", &row.avg));
    }
    let hr = parse_count("HR", &row.hr)?;
    let rbi = parse_count("RBI", &row.rbi)?;

    StatRecord::new(row.player.trim(), avg, hr, rbi).ok_or(RowRejection::Blank("Player"))
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    raw: &str,
) -> std::result::Result<T, RowRejection> {
    raw.trim().parse::<T>().map_err(|_| invalid(field, raw))
}

/// Counting stats are never negative in the source export
fn parse_count(field: &'static str, raw: &str) -> std::result::Result<i32, RowRejection> {
    let count = parse_number::<i32>(field, raw)?;
    if count < 0 {
        return Err(invalid(field, raw));
    }
    Ok(count)
}

fn invalid(field: &'static str, raw: &str) -> RowRejection {
    RowRejection::InvalidNumber {
        field,
        value: raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TextCodec;
    use crate::port::durable_queue::mocks::InMemoryQueue;
    use crate::port::stat_source::mocks::VecSource;

    fn producer(queue: &InMemoryQueue) -> Producer {
        Producer::new(Arc::new(queue.clone()), Arc::new(TextCodec::new()))
    }

    #[test]
    fn test_record_from_row() {
        let row = SourceRow::new("Mike Trout", "LAA", "0.300", "15", "40");
        let record = record_from_row(&row).unwrap();
        assert_eq!(record.player(), "Mike Trout");
        assert_eq!(record.batting_average(), 0.3);
        assert_eq!(record.home_runs(), 15);
        assert_eq!(record.runs_batted_in(), 40);
    }

    #[test]
    fn test_record_from_row_blank_fields() {
        let row = SourceRow::new("Mike Trout", "LAA", "", "15", "40");
        assert_eq!(record_from_row(&row), Err(RowRejection::Blank("AVG")));

        let row = SourceRow::new("Mike Trout", "LAA", "0.300", "15", "  ");
        assert_eq!(record_from_row(&row), Err(RowRejection::Blank("RBI")));

        let row = SourceRow::new(" ", "LAA", "0.300", "15", "40");
        assert_eq!(record_from_row(&row), Err(RowRejection::Blank("Player")));
    }

    #[test]
    fn test_record_from_row_invalid_number() {
        let row = SourceRow::new("Mike Trout", "LAA", "0.300", "fifteen", "40");
        assert_eq!(
            record_from_row(&row),
            Err(RowRejection::InvalidNumber {
                field: "HR",
                value: "fifteen".to_string()
            })
        );
    }

    #[test]
    fn test_record_from_row_rejects_non_finite_average() {
        for raw in ["NaN", "inf", "-infinity"] {
            let row = SourceRow::new("Ghost", "LAA", raw, "15", "40");
            assert_eq!(
                record_from_row(&row),
                Err(RowRejection::InvalidNumber {
                    field: "AVG",
                    value: raw.to_string()
                })
            );
        }
    }

    #[test]
    fn test_record_from_row_rejects_negative_counts() {
        let row = SourceRow::new("Mike Trout", "LAA", "0.300", "-5", "40");
        assert_eq!(
            record_from_row(&row),
            Err(RowRejection::InvalidNumber {
                field: "HR",
                value: "-5".to_string()
            })
        );

        let row = SourceRow::new("Mike Trout", "LAA", "0.300", "15", " -1 ");
        assert_eq!(
            record_from_row(&row),
            Err(RowRejection::InvalidNumber {
                field: "RBI",
                value: "-1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_run_skips_rows_the_codec_cannot_carry() {
        let queue = InMemoryQueue::new();
        let mut source = VecSource::new(vec![
            SourceRow::new("Ghost", "LAA", "NaN", "15", "40"),
            SourceRow::new("Inf", "LAA", "inf", "15", "40"),
            SourceRow::new("Minus", "LAA", "0.300", "-5", "40"),
            SourceRow::new("Mike Trout", "LAA", "0.300", "15", "40"),
        ]);

        let report = producer(&queue).run(&mut source).await.unwrap();
        assert_eq!(report.skipped_invalid, 3);
        assert_eq!(report.published, 1);

        let codec = TextCodec::new();
        for payload in queue.published("american-league") {
            assert!(codec.decode(payload.as_bytes()).is_ok(), "{}", payload);
        }
    }

    #[tokio::test]
    async fn test_run_routes_to_league_queues() {
        let queue = InMemoryQueue::new();
        let mut source = VecSource::new(vec![
            SourceRow::new("Mike Trout", "LAA", "0.300", "15", "40"),
            SourceRow::new("Mookie Betts", "LAD", "0.289", "19", "75"),
        ]);

        let report = producer(&queue).run(&mut source).await.unwrap();

        assert_eq!(report.published, 2);
        assert_eq!(
            queue.published("american-league"),
            vec!["Player: Mike Trout, avg: 0.3, hr: 15, rbi: 40"]
        );
        assert_eq!(
            queue.published("national-league"),
            vec!["Player: Mookie Betts, avg: 0.289, hr: 19, rbi: 75"]
        );
    }

    #[tokio::test]
    async fn test_run_skips_bad_rows_and_continues() {
        let queue = InMemoryQueue::new();
        let mut source = VecSource::with_results(vec![
            Ok(SourceRow::new("Nobody", "XYZ", "0.300", "15", "40")),
            Ok(SourceRow::new("No Stats", "NYY", "", "", "")),
            Ok(SourceRow::new("Typo", "BOS", "0.3x0", "15", "40")),
            Err(AppError::Source("malformed record".into())),
            Ok(SourceRow::new("Pete Alonso", "NYM", "0.240", "34", "88")),
        ]);

        let report = producer(&queue).run(&mut source).await.unwrap();

        assert_eq!(
            report,
            ProducerReport {
                rows_read: 5,
                published: 1,
                unrouted: 1,
                skipped_blank: 1,
                skipped_invalid: 1,
                unreadable: 1,
                publish_failures: 0,
            }
        );
        assert!(queue.published("american-league").is_empty());
        assert_eq!(queue.published("national-league").len(), 1);
    }

    #[tokio::test]
    async fn test_non_fatal_publish_failure_does_not_abort() {
        let queue = InMemoryQueue::new();
        queue.fail_next_publishes(1);
        let mut source = VecSource::new(vec![
            SourceRow::new("First", "SEA", "0.300", "15", "40"),
            SourceRow::new("Second", "SEA", "0.300", "15", "40"),
        ]);

        let report = producer(&queue).run(&mut source).await.unwrap();

        assert_eq!(report.publish_failures, 1);
        assert_eq!(report.published, 1);
        assert_eq!(
            queue.published("american-league"),
            vec!["Player: Second, avg: 0.3, hr: 15, rbi: 40"]
        );
    }

    #[tokio::test]
    async fn test_connection_loss_aborts_run() {
        let queue = InMemoryQueue::new();
        let mut source = VecSource::new(vec![SourceRow::new("First", "SEA", "0.300", "15", "40")]);
        queue.disconnect();

        let err = producer(&queue).run(&mut source).await.unwrap_err();
        assert!(err.is_connection_fatal());
    }

    #[tokio::test]
    async fn test_source_io_error_aborts_run() {
        let queue = InMemoryQueue::new();
        let mut source = VecSource::with_results(vec![Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "truncated",
        )))]);

        let err = producer(&queue).run(&mut source).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_declares_both_queues() {
        let queue = InMemoryQueue::new();
        let mut source = VecSource::new(vec![]);
        producer(&queue).run(&mut source).await.unwrap();

        // Declared queues accept publishes
        queue.publish("american-league", b"x").await.unwrap();
        queue.publish("national-league", b"x").await.unwrap();
    }
}
