// Alert Predicate
//
// Thresholds are fixed. A record alerts only when it clears all three.

use super::league::League;
use super::stat_record::StatRecord;

pub const BATTING_AVERAGE_THRESHOLD: f64 = 0.280;
pub const HOME_RUN_THRESHOLD: i32 = 10;
pub const RBI_THRESHOLD: i32 = 30;

/// Strictly greater than every threshold
pub fn evaluate(record: &StatRecord) -> bool {
    record.batting_average() > BATTING_AVERAGE_THRESHOLD
        && record.home_runs() > HOME_RUN_THRESHOLD
        && record.runs_batted_in() > RBI_THRESHOLD
}

/// A record that met the alert criteria, tagged with the league it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub player: String,
    pub league: League,
    pub batting_average: f64,
    pub home_runs: i32,
    pub runs_batted_in: i32,
}

impl Alert {
    /// Returns `Some` only when the record passes [`evaluate`].
    pub fn for_record(record: &StatRecord, league: League) -> Option<Self> {
        evaluate(record).then(|| Self {
            player: record.player().to_string(),
            league,
            batting_average: record.batting_average(),
            home_runs: record.home_runs(),
            runs_batted_in: record.runs_batted_in(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(avg: f64, hr: i32, rbi: i32) -> StatRecord {
        StatRecord::new("Test Player", avg, hr, rbi).unwrap()
    }

    #[test]
    fn test_all_thresholds_cleared() {
        assert!(evaluate(&record(0.300, 15, 40)));
        assert!(evaluate(&record(0.281, 11, 31)));
    }

    #[test]
    fn test_boundaries_do_not_alert() {
        assert!(!evaluate(&record(0.280, 15, 40)));
        assert!(!evaluate(&record(0.300, 10, 40)));
        assert!(!evaluate(&record(0.300, 15, 30)));
        assert!(!evaluate(&record(0.280, 10, 30)));
    }

    #[test]
    fn test_no_partial_credit() {
        // Each case fails exactly one condition
        assert!(!evaluate(&record(0.250, 20, 50)));
        assert!(!evaluate(&record(0.350, 2, 50)));
        assert!(!evaluate(&record(0.350, 20, 5)));
    }

    #[test]
    fn test_alert_for_record() {
        let hit = record(0.310, 25, 70);
        let alert = Alert::for_record(&hit, League::National).unwrap();
        assert_eq!(alert.player, "Test Player");
        assert_eq!(alert.league, League::National);
        assert_eq!(alert.home_runs, 25);

        assert!(Alert::for_record(&record(0.2, 1, 1), League::National).is_none());
    }
}
