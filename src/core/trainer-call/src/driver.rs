//! Runs state-machine effects against the SDK and the start endpoint.

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{AssistantConfig, CallError, CallEvent, CallSession, Effect, Navigation};

/// Why the start endpoint did not produce an assistant configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// Endpoint answered with a non-success status.
    Rejected {
        /// HTTP status code.
        status: u16,
    },
    /// Endpoint unreachable or response unreadable.
    Failed(String),
}

/// Calls the "start web call" endpoint.
#[async_trait]
pub trait CallStarter: Send + Sync {
    /// Requests an assistant configuration for the scenario.
    async fn start_web_call(&self, scenario_id: &str) -> Result<AssistantConfig, StartError>;
}

/// The real-time voice SDK.
///
/// `start` only kicks off the session; the SDK reports `call-start` later
/// through its callbacks, which the caller turns into [`CallEvent`]s.
#[async_trait]
pub trait VoiceSdk: Send + Sync {
    /// Starts a session with the given assistant.
    async fn start(&self, assistant: &AssistantConfig) -> Result<(), CallError>;

    /// Stops the current session.
    async fn stop(&self) -> Result<(), CallError>;
}

/// Owns a [`CallSession`] and executes its effects.
pub struct CallDriver<S, A> {
    session: CallSession,
    sdk: S,
    starter: A,
}

impl<S: VoiceSdk, A: CallStarter> CallDriver<S, A> {
    /// Creates a driver for a scenario.
    pub fn new(scenario_id: impl Into<String>, sdk: S, starter: A) -> Self {
        Self {
            session: CallSession::new(scenario_id),
            sdk,
            starter,
        }
    }

    /// Current session state.
    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Feeds one event and runs the resulting effects to completion.
    ///
    /// SDK and endpoint outcomes are fed back as further events. The
    /// navigations produced along the way are returned for the page to
    /// perform.
    pub async fn dispatch(&mut self, event: CallEvent) -> Result<Vec<Navigation>, CallError> {
        let mut queue = VecDeque::from([event]);
        let mut navigations = Vec::new();

        while let Some(event) = queue.pop_front() {
            let before = self.session.state();
            let effects = self.session.apply(event)?;

            debug!(
                scenario = %self.session.scenario_id(),
                from = ?before,
                to = ?self.session.state(),
                effects = effects.len(),
                "Call transition"
            );

            for effect in effects {
                match effect {
                    Effect::RequestStart { scenario_id } => {
                        let next = match self.starter.start_web_call(&scenario_id).await {
                            Ok(config) => CallEvent::StartAccepted(config),
                            Err(StartError::Rejected { status }) => {
                                CallEvent::StartRejected { status }
                            },
                            Err(StartError::Failed(reason)) => CallEvent::StartFailed(reason),
                        };
                        queue.push_back(next);
                    },
                    Effect::StartSdk(config) => {
                        if let Err(e) = self.sdk.start(&config).await {
                            queue.push_back(CallEvent::SdkError(e.to_string()));
                        }
                    },
                    Effect::StopSdk => {
                        if let Err(e) = self.sdk.stop().await {
                            warn!(error = %e, "Voice SDK failed to stop");
                        }
                    },
                    Effect::Navigate(navigation) => navigations.push(navigation),
                }
            }
        }

        Ok(navigations)
    }
}
