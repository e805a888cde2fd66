// Panic isolation at the per-message boundary
use std::panic::{catch_unwind, UnwindSafe};
use tracing::error;

/// Result of a panic-guarded call
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    Success(T),
    /// Panic payload rendered as text
    Panicked(String),
}

/// Run `f`, converting a panic into `PanicGuardResult::Panicked` so one bad
/// message cannot take down its subscription loop.
///
/// # Example
/// ```text
/// let outcome = execute_guarded(AssertUnwindSafe(|| handler.handle(payload)));
/// ```
pub fn execute_guarded<F, T>(f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            error!(panic_msg = %panic_msg, "Message handler panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}
