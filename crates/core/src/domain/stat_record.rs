// StatRecord Domain Model

use std::fmt;

/// One player's batting line. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    player: String,
    batting_average: f64,
    home_runs: i32,
    runs_batted_in: i32,
}

impl StatRecord {
    /// Returns `None` when the player name is blank.
    pub fn new(
        player: impl Into<String>,
        batting_average: f64,
        home_runs: i32,
        runs_batted_in: i32,
    ) -> Option<Self> {
        let player = player.into();
        if player.trim().is_empty() {
            return None;
        }
        Some(Self {
            player,
            batting_average,
            home_runs,
            runs_batted_in,
        })
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn batting_average(&self) -> f64 {
        self.batting_average
    }

    pub fn home_runs(&self) -> i32 {
        self.home_runs
    }

    pub fn runs_batted_in(&self) -> i32 {
        self.runs_batted_in
    }
}

impl fmt::Display for StatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (AVG: {}, HR: {}, RBI: {})",
            self.player, self.batting_average, self.home_runs, self.runs_batted_in
        )
    }
}
