use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Result type returned by every script callback
pub type CallbackResult<T> = Result<T, CallbackError>;

/// Why a single callback invocation did not count as an execution
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A callback may return this to reject a result it produced; the run
    /// is not counted and its value is never folded
    #[error("invalid return value: {0}")]
    InvalidReturn(String),

    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl From<anyhow::Error> for CallbackError {
    fn from(err: anyhow::Error) -> Self {
        CallbackError::Runtime(format!("{:#}", err))
    }
}

/// Run a callback, turning a panic into a [`CallbackError::Panicked`]
///
/// The registry and scheduler never let a callback unwind into their scan.
pub(crate) fn invoke_guarded<T>(f: impl FnOnce() -> CallbackResult<T>) -> CallbackResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CallbackError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
