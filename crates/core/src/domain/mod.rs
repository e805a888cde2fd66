// Domain Layer - Pure business logic and entities

pub mod alert;
pub mod codec;
pub mod error;
pub mod league;
pub mod stat_record;

// Re-exports
pub use alert::{evaluate, Alert};
pub use codec::{MessageCodec, TextCodec, TextEncoding};
pub use error::{ParseError, ParseFailure, Unrouted};
pub use league::{route, League};
pub use stat_record::StatRecord;
