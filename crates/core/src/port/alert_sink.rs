// Alert Sink Port
// Where alerts go once the predicate fires. Emission never affects delivery outcome.

use crate::domain::Alert;
use tracing::info;

pub trait AlertSink: Send + Sync {
    fn emit(&self, alert: &Alert);
}

/// Writes each alert as one structured log event
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn emit(&self, alert: &Alert) {
        info!(
            target: "mlb_stats::alert",
            player = %alert.player,
            league = %alert.league,
            avg = alert.batting_average,
            hr = alert.home_runs,
            rbi = alert.runs_batted_in,
            "Alert: {} in the {} meets all criteria",
            alert.player,
            alert.league
        );
    }
}

pub mod mocks {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    /// Collects alerts for assertions. Optionally panics for one player,
    /// to exercise per-message panic isolation.
    #[derive(Default)]
    pub struct RecordingAlertSink {
        alerts: Mutex<Vec<Alert>>,
        panic_on: Option<String>,
    }

    impl RecordingAlertSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn panicking_on(player: impl Into<String>) -> Self {
            Self {
                alerts: Mutex::new(Vec::new()),
                panic_on: Some(player.into()),
            }
        }

        pub fn alerts(&self) -> Vec<Alert> {
            self.alerts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl AlertSink for RecordingAlertSink {
        fn emit(&self, alert: &Alert) {
            if self.panic_on.as_deref() == Some(alert.player.as_str()) {
                panic!("alert sink failure for {}", alert.player);
            }
            self.alerts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(alert.clone());
        }
    }
}
