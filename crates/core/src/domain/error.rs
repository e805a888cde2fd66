// Domain Error Types

use thiserror::Error;

/// Why a wire payload could not be turned into a StatRecord
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("payload is not valid {0} text")]
    Encoding(&'static str),

    #[error("expected 4 fields, found {found}")]
    FieldCount { found: usize },

    #[error("field {field} has no ':' separator")]
    MissingSeparator { field: usize },

    #[error("expected key '{expected}', found '{found}'")]
    UnexpectedKey { expected: &'static str, found: String },

    #[error("player name is empty")]
    EmptyPlayer,

    #[error("invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

/// Decode failure carrying the offending payload for diagnostics
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason} (payload: {raw_payload:?})")]
pub struct ParseError {
    pub reason: ParseFailure,
    pub raw_payload: String,
}

impl ParseError {
    pub fn new(reason: ParseFailure, raw_payload: impl Into<String>) -> Self {
        Self {
            reason,
            raw_payload: raw_payload.into(),
        }
    }
}

/// Team code that belongs to neither league
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("team '{team}' not found in league lists")]
pub struct Unrouted {
    pub team: String,
}
