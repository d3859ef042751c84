//! # Trainer Call
//!
//! Live voice-call session for a roleplay scenario.
//!
//! The third-party voice SDK reports `call-start`, `call-end`, `message`
//! and `error` callbacks. Instead of letting each callback mutate page
//! state, every callback becomes a [`CallEvent`] fed into one transition
//! function, [`CallSession::apply`], which returns the [`Effect`]s to run.
//!
//! ```text
//! Idle -> Connecting -> Active -> Ended
//!             |           |
//!             +-----------+-----> Errored
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod message;
pub mod state;

pub use driver::{CallDriver, CallStarter, StartError, VoiceSdk};
pub use error::CallError;
pub use message::{AssistantConfig, SdkMessage, Speaker, TranscriptKind, TranscriptLine};
pub use state::{CallEvent, CallSession, CallState, Effect, Navigation, SCENARIO_ROUTE};
