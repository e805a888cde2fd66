// Stat Source Port (Interface)

use crate::error::Result;

/// One raw row from the batch source. Values are untrimmed text exactly as read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRow {
    /// 1-based data row number (header excluded), for diagnostics
    pub line: u64,
    pub player: String,
    pub team: String,
    pub avg: String,
    pub hr: String,
    pub rbi: String,
}

impl SourceRow {
    pub fn new(
        player: impl Into<String>,
        team: impl Into<String>,
        avg: impl Into<String>,
        hr: impl Into<String>,
        rbi: impl Into<String>,
    ) -> Self {
        Self {
            line: 0,
            player: player.into(),
            team: team.into(),
            avg: avg.into(),
            hr: hr.into(),
            rbi: rbi.into(),
        }
    }
}

/// Ordered source of player rows
pub trait StatSource: Send {
    /// Next row in source order, `None` once the input is exhausted.
    /// An `Err` affects only that row; the caller may keep reading.
    fn next_row(&mut self) -> Option<Result<SourceRow>>;
}

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory source for tests
    pub struct VecSource {
        rows: VecDeque<Result<SourceRow>>,
    }

    impl VecSource {
        pub fn new(rows: Vec<SourceRow>) -> Self {
            Self::with_results(rows.into_iter().map(Ok).collect())
        }

        pub fn with_results(rows: Vec<Result<SourceRow>>) -> Self {
            let rows = rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| {
                    row.map(|mut r| {
                        r.line = i as u64 + 1;
                        r
                    })
                })
                .collect();
            Self { rows }
        }
    }

    impl StatSource for VecSource {
        fn next_row(&mut self) -> Option<Result<SourceRow>> {
            self.rows.pop_front()
        }
    }
}
