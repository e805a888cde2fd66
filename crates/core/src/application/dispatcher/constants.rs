// Dispatcher constants (no magic values)

/// Unacknowledged deliveries allowed per consumer. Must stay 1: each
/// subscription processes strictly one message at a time.
pub const PREFETCH_LIMIT: u16 = 1;

/// League queues survive broker restarts
pub const QUEUE_DURABLE: bool = true;
