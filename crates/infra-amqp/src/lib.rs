// MLB Stats Infrastructure - AMQP Adapter
// Implements: DurableQueue, Subscription, DeliveryAcker over lapin

mod connection;
mod error;
mod queue;

pub use connection::AmqpEndpoint;
pub use error::map_lapin_error;
pub use queue::AmqpQueue;
