// Per-delivery handling, shared by every league subscription

use crate::domain::{Alert, League, MessageCodec, ParseError};
use crate::port::AlertSink;
use std::sync::Arc;
use tracing::info;

/// What happened to one payload. Every outcome is followed by an ack.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    Alerted(Alert),
    /// Decoded, but did not meet the alert criteria
    Quiet,
    /// Could not be decoded; consumed without requeue
    Discarded(ParseError),
}

/// Handler invoked by a subscription loop for each payload
pub trait DeliveryHandler: Send + Sync {
    fn league(&self) -> League;

    fn handle(&self, payload: &[u8]) -> HandleOutcome;
}

/// Decode, evaluate, alert. One instance per league.
pub struct LeagueHandler {
    league: League,
    codec: Arc<dyn MessageCodec>,
    alerts: Arc<dyn AlertSink>,
}

impl LeagueHandler {
    pub fn new(league: League, codec: Arc<dyn MessageCodec>, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            league,
            codec,
            alerts,
        }
    }
}

impl DeliveryHandler for LeagueHandler {
    fn league(&self) -> League {
        self.league
    }

    fn handle(&self, payload: &[u8]) -> HandleOutcome {
        let record = match self.codec.decode(payload) {
            Ok(record) => record,
            Err(e) => return HandleOutcome::Discarded(e),
        };

        info!(league = %self.league, record = %record, "Received from {} queue", self.league);

        match Alert::for_record(&record, self.league) {
            Some(alert) => {
                self.alerts.emit(&alert);
                HandleOutcome::Alerted(alert)
            }
            None => HandleOutcome::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParseFailure, TextCodec};
    use crate::port::alert_sink::mocks::RecordingAlertSink;

    fn handler(league: League, sink: &Arc<RecordingAlertSink>) -> LeagueHandler {
        LeagueHandler::new(league, Arc::new(TextCodec::new()), sink.clone())
    }

    #[test]
    fn test_alerting_record() {
        let sink = Arc::new(RecordingAlertSink::new());
        let outcome = handler(League::American, &sink)
            .handle(b"Player: Mike Trout, avg: 0.3, hr: 15, rbi: 40");

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].player, "Mike Trout");
        assert_eq!(alerts[0].league, League::American);
        assert_eq!(outcome, HandleOutcome::Alerted(alerts[0].clone()));
    }

    #[test]
    fn test_quiet_record() {
        let sink = Arc::new(RecordingAlertSink::new());
        let outcome = handler(League::National, &sink)
            .handle(b"Player: Jane Doe, avg: 0.250, hr: 20, rbi: 50");

        assert_eq!(outcome, HandleOutcome::Quiet);
        assert!(sink.alerts().is_empty());
    }

    #[test]
    fn test_malformed_record_discarded() {
        let sink = Arc::new(RecordingAlertSink::new());
        let outcome = handler(League::National, &sink).handle(b"Player: Jane Doe, avg: 0.250");

        match outcome {
            HandleOutcome::Discarded(e) => {
                assert_eq!(e.reason, ParseFailure::FieldCount { found: 2 })
            }
            other => panic!("expected discard, got {:?}", other),
        }
        assert!(sink.alerts().is_empty());
    }
}
