// CSV StatSource Implementation

use mlb_stats_core::error::{AppError, Result};
use mlb_stats_core::port::{SourceRow, StatSource};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Header names that must be present (other columns are ignored)
pub const REQUIRED_COLUMNS: [&str; 5] = ["Player", "Team", "AVG", "HR", "RBI"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Player")]
    player: String,
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "AVG")]
    avg: String,
    #[serde(rename = "HR")]
    hr: String,
    #[serde(rename = "RBI")]
    rbi: String,
}

/// Streams rows from a CSV export in file order. A leading UTF-8 BOM is
/// stripped by the csv reader.
pub struct CsvStatSource<R: Read> {
    rows: csv::DeserializeRecordsIntoIter<R, CsvRow>,
    line: u64,
}

impl CsvStatSource<File> {
    /// Open `path` and validate its header
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AppError::Source(format!("cannot open {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Reading player stats");
        Self::from_reader(file)
    }
}

impl<R: Read> CsvStatSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers().map_err(map_csv_error)?;
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Source(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            rows: reader.into_deserialize(),
            line: 0,
        })
    }
}

impl<R: Read + Send> StatSource for CsvStatSource<R> {
    fn next_row(&mut self) -> Option<Result<SourceRow>> {
        let next = self.rows.next()?;
        self.line += 1;
        let line = self.line;
        Some(
            next.map(|row| SourceRow {
                line,
                player: row.player,
                team: row.team,
                avg: row.avg,
                hr: row.hr,
                rbi: row.rbi,
            })
            .map_err(map_csv_error),
        )
    }
}

/// I/O failures stay `AppError::Io` (fatal to the batch); anything else is a
/// per-row `AppError::Source`.
fn map_csv_error(err: csv::Error) -> AppError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => AppError::Io(e),
            other => AppError::Source(format!("{:?}", other)),
        }
    } else {
        AppError::Source(err.to_string())
    }
}
