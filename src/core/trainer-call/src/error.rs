//! Call error types.

use thiserror::Error;

use crate::CallState;

/// Errors that can occur while driving a call.
#[derive(Debug, Error)]
pub enum CallError {
    /// The event is not valid in the current state.
    #[error("cannot handle {event} while {state:?}")]
    InvalidTransition {
        /// State the session was in.
        state: CallState,
        /// Name of the rejected event.
        event: &'static str,
    },

    /// The voice SDK reported a failure.
    #[error("voice sdk error: {0}")]
    Sdk(String),
}
