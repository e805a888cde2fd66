// Application Layer - Use Cases

pub mod dispatcher;
pub mod producer;
pub mod shutdown;

// Re-exports
pub use dispatcher::{DispatchReport, Dispatcher, SubscriptionStats};
pub use producer::{Producer, ProducerReport};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
