// Message Codec
//
// Wire grammar: `Player: <name>, avg: <float>, hr: <int>, rbi: <int>`
// Names are not escaped; a ',' inside a name yields a FieldCount error on decode.

use super::error::{ParseError, ParseFailure};
use super::stat_record::StatRecord;
use std::borrow::Cow;
use tracing::warn;

const FIELD_DELIMITER: char = ',';
const KEY_DELIMITER: char = ':';
const FIELD_KEYS: [&str; 4] = ["Player", "avg", "hr", "rbi"];

/// Converts records to and from queue payloads
pub trait MessageCodec: Send + Sync {
    fn encode(&self, record: &StatRecord) -> Vec<u8>;

    fn decode(&self, payload: &[u8]) -> Result<StatRecord, ParseError>;
}

/// Text encodings the codec knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "Latin-1",
        }
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            // Every byte is a valid Latin-1 code point
            TextEncoding::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
        }
    }
}

/// Delimiter-based text codec. Reads UTF-8, falling back once to a
/// secondary encoding (Latin-1 by default).
#[derive(Debug, Clone)]
pub struct TextCodec {
    fallback: Option<TextEncoding>,
}

impl Default for TextCodec {
    fn default() -> Self {
        Self {
            fallback: Some(TextEncoding::Latin1),
        }
    }
}

impl TextCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// UTF-8 only: non UTF-8 payloads fail with `ParseFailure::Encoding`
    pub fn strict() -> Self {
        Self { fallback: None }
    }

    fn decode_text<'a>(&self, payload: &'a [u8]) -> Result<Cow<'a, str>, ParseError> {
        if let Some(text) = TextEncoding::Utf8.decode(payload) {
            return Ok(text);
        }

        let lossy = String::from_utf8_lossy(payload);
        match self.fallback {
            Some(encoding) => {
                warn!(
                    fallback = encoding.name(),
                    "Payload is not valid UTF-8, retrying with fallback encoding"
                );
                encoding.decode(payload).ok_or_else(|| {
                    ParseError::new(ParseFailure::Encoding(encoding.name()), lossy.into_owned())
                })
            }
            None => Err(ParseError::new(
                ParseFailure::Encoding(TextEncoding::Utf8.name()),
                lossy.into_owned(),
            )),
        }
    }
}

impl MessageCodec for TextCodec {
    fn encode(&self, record: &StatRecord) -> Vec<u8> {
        // `{:?}` keeps a fractional part on whole numbers (1.0, not 1)
        format!(
            "Player: {}, avg: {:?}, hr: {}, rbi: {}",
            record.player(),
            record.batting_average(),
            record.home_runs(),
            record.runs_batted_in()
        )
        .into_bytes()
    }

    fn decode(&self, payload: &[u8]) -> Result<StatRecord, ParseError> {
        let text = self.decode_text(payload)?;
        parse_fields(&text).map_err(|reason| ParseError::new(reason, &*text))
    }
}

fn parse_fields(text: &str) -> Result<StatRecord, ParseFailure> {
    let fields: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_KEYS.len() {
        return Err(ParseFailure::FieldCount {
            found: fields.len(),
        });
    }

    let player = field_value(fields[0], 0)?;
    let avg = field_value(fields[1], 1)?;
    let hr = field_value(fields[2], 2)?;
    let rbi = field_value(fields[3], 3)?;

    let batting_average = avg
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid_number(FIELD_KEYS[1], avg))?;
    let home_runs = hr
        .parse::<i32>()
        .map_err(|_| invalid_number(FIELD_KEYS[2], hr))?;
    let runs_batted_in = rbi
        .parse::<i32>()
        .map_err(|_| invalid_number(FIELD_KEYS[3], rbi))?;

    StatRecord::new(player, batting_average, home_runs, runs_batted_in)
        .ok_or(ParseFailure::EmptyPlayer)
}

/// Value of the `index`-th field after checking its key
fn field_value(field: &str, index: usize) -> Result<&str, ParseFailure> {
    let (key, value) = field
        .split_once(KEY_DELIMITER)
        .ok_or(ParseFailure::MissingSeparator { field: index })?;

    let expected = FIELD_KEYS[index];
    if key.trim() != expected {
        return Err(ParseFailure::UnexpectedKey {
            expected,
            found: key.trim().to_string(),
        });
    }
    Ok(value.trim())
}

fn invalid_number(field: &'static str, value: &str) -> ParseFailure {
    ParseFailure::InvalidNumber {
        field,
        value: value.to_string(),
    }
}
