// League routing

use super::error::Unrouted;
use std::fmt;
use std::str::FromStr;

const AMERICAN_LEAGUE_TEAMS: &[&str] = &[
    "BAL", "BOS", "NYY", "TB", "TOR", "CWS", "CLE", "DET", "KC", "MIN", "HOU", "LAA", "OAK",
    "SEA", "TEX",
];

const NATIONAL_LEAGUE_TEAMS: &[&str] = &[
    "ATL", "MIA", "NYM", "PHI", "WSH", "CHC", "CIN", "MIL", "PIT", "STL", "ARI", "COL", "LAD",
    "SD", "SF",
];

/// Partitioning key for the durable queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum League {
    American,
    National,
}

impl League {
    pub const ALL: [League; 2] = [League::National, League::American];

    /// Durable queue holding this league's records
    pub fn queue_name(&self) -> &'static str {
        match self {
            League::American => "american-league",
            League::National => "national-league",
        }
    }

    /// Human-readable label used in logs and alerts
    pub fn label(&self) -> &'static str {
        match self {
            League::American => "American League",
            League::National => "National League",
        }
    }

    fn teams(&self) -> &'static [&'static str] {
        match self {
            League::American => AMERICAN_LEAGUE_TEAMS,
            League::National => NATIONAL_LEAGUE_TEAMS,
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for League {
    type Err = String;

    /// Parses a queue name (`american-league` / `national-league`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        League::ALL
            .into_iter()
            .find(|league| league.queue_name() == s)
            .ok_or_else(|| {
                format!(
                    "unknown queue '{}', expected one of: {}, {}",
                    s,
                    League::National.queue_name(),
                    League::American.queue_name()
                )
            })
    }
}

/// Map a team code to its league. Codes are matched exactly after trimming.
pub fn route(team: &str) -> Result<League, Unrouted> {
    let code = team.trim();
    League::ALL
        .into_iter()
        .find(|league| league.teams().contains(&code))
        .ok_or_else(|| Unrouted {
            team: team.to_string(),
        })
}
