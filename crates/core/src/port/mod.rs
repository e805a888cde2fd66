// Port Layer - Interfaces for external dependencies

pub mod alert_sink;
pub mod durable_queue;
pub mod stat_source;

// Re-exports
pub use alert_sink::{AlertSink, TracingAlertSink};
pub use durable_queue::{Delivery, DeliveryAcker, DurableQueue, Subscription};
pub use stat_source::{SourceRow, StatSource};
