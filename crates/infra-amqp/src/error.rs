// lapin::Error -> AppError
//
// Anything that means the connection (or the adapter's only publishing
// channel) is unusable maps to AppError::Connection, which callers treat as fatal.

use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use mlb_stats_core::error::AppError;

pub fn map_lapin_error(err: lapin::Error) -> AppError {
    match &err {
        lapin::Error::IOError(_) | lapin::Error::InvalidConnectionState(_) => {
            AppError::Connection(err.to_string())
        }
        lapin::Error::InvalidChannelState(state) => {
            AppError::Connection(format!("channel unusable ({:?}): {}", state, err))
        }
        lapin::Error::ProtocolError(amqp) => match amqp.kind() {
            AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED) => {
                AppError::Conflict(amqp.to_string())
            }
            AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND) => AppError::NotFound(amqp.to_string()),
            AMQPErrorKind::Hard(_) => AppError::Connection(amqp.to_string()),
            _ => AppError::Broker(amqp.to_string()),
        },
        _ => AppError::Broker(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::protocol::{AMQPError, AMQPHardError};
    use lapin::{ChannelState, ConnectionState};
    use std::io;
    use std::sync::Arc;

    fn protocol(kind: AMQPErrorKind) -> lapin::Error {
        lapin::Error::ProtocolError(AMQPError::new(kind, "broker said no".into()))
    }

    #[test]
    fn test_io_and_state_errors_are_fatal() {
        let refused = lapin::Error::IOError(Arc::new(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )));
        let mapped = map_lapin_error(refused);
        assert!(matches!(mapped, AppError::Connection(_)));
        assert!(mapped.is_connection_fatal());

        let mapped = map_lapin_error(lapin::Error::InvalidConnectionState(ConnectionState::Closed));
        assert!(mapped.is_connection_fatal());

        let mapped = map_lapin_error(lapin::Error::InvalidChannelState(ChannelState::Closed));
        assert!(matches!(mapped, AppError::Connection(_)));
        assert!(mapped.is_connection_fatal());
    }

    #[test]
    fn test_soft_protocol_errors_stay_per_operation() {
        let mapped = map_lapin_error(protocol(AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED)));
        assert!(matches!(mapped, AppError::Conflict(_)));
        assert!(!mapped.is_connection_fatal());

        let mapped = map_lapin_error(protocol(AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND)));
        assert!(matches!(mapped, AppError::NotFound(_)));
        assert!(!mapped.is_connection_fatal());

        let mapped = map_lapin_error(protocol(AMQPErrorKind::Soft(AMQPSoftError::ACCESSREFUSED)));
        assert!(matches!(mapped, AppError::Broker(_)));
        assert!(!mapped.is_connection_fatal());
    }

    #[test]
    fn test_hard_protocol_error_is_fatal() {
        let mapped = map_lapin_error(protocol(AMQPErrorKind::Hard(AMQPHardError::CONNECTIONFORCED)));
        assert!(matches!(mapped, AppError::Connection(_)));
        assert!(mapped.is_connection_fatal());
    }

    #[test]
    fn test_other_errors_map_to_broker() {
        let mapped = map_lapin_error(lapin::Error::ChannelsLimitReached);
        assert!(matches!(mapped, AppError::Broker(_)));
        assert!(!mapped.is_connection_fatal());
    }
}
