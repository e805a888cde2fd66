// MLB Stats Infrastructure - CSV Source
// Implements: StatSource over a batter stats export

mod source;

pub use source::{CsvStatSource, REQUIRED_COLUMNS};
