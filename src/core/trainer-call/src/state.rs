//! Call state machine.

use serde::Serialize;

use crate::{AssistantConfig, CallError, SdkMessage, TranscriptKind, TranscriptLine};

/// Where the page goes after a failed start or an SDK error.
pub const SCENARIO_ROUTE: &str = "/scenario";

/// Lifecycle state of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Nothing started yet.
    Idle,
    /// Start endpoint called or SDK starting.
    Connecting,
    /// SDK reported `call-start`.
    Active,
    /// Call finished normally.
    Ended,
    /// Call failed.
    Errored,
}

impl CallState {
    /// Returns true for `Ended` and `Errored`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended | CallState::Errored)
    }

    fn is_live(&self) -> bool {
        matches!(self, CallState::Connecting | CallState::Active)
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// The trainee pressed "Start".
    StartRequested,
    /// The start endpoint returned an assistant configuration.
    StartAccepted(AssistantConfig),
    /// The start endpoint answered with a non-success status.
    StartRejected {
        /// HTTP status code.
        status: u16,
    },
    /// The start endpoint could not be reached or answered garbage.
    StartFailed(String),
    /// SDK `call-start`.
    CallStarted,
    /// SDK `message`.
    Message(SdkMessage),
    /// SDK `call-end`.
    CallEnded,
    /// SDK `error`.
    SdkError(String),
    /// The trainee pressed "End".
    StopRequested,
    /// The page is going away.
    Dispose,
}

impl CallEvent {
    fn name(&self) -> &'static str {
        match self {
            CallEvent::StartRequested => "start_requested",
            CallEvent::StartAccepted(_) => "start_accepted",
            CallEvent::StartRejected { .. } => "start_rejected",
            CallEvent::StartFailed(_) => "start_failed",
            CallEvent::CallStarted => "call_started",
            CallEvent::Message(_) => "message",
            CallEvent::CallEnded => "call_ended",
            CallEvent::SdkError(_) => "sdk_error",
            CallEvent::StopRequested => "stop_requested",
            CallEvent::Dispose => "dispose",
        }
    }
}

/// Page navigation requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// Go back in history.
    Back,
    /// Go to a route.
    To(String),
}

/// Side effect to perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call the start endpoint for the scenario.
    RequestStart {
        /// Scenario to start.
        scenario_id: String,
    },
    /// Hand the assistant configuration to the SDK.
    StartSdk(AssistantConfig),
    /// Stop the SDK session.
    StopSdk,
    /// Navigate away.
    Navigate(Navigation),
}

/// One call for one scenario.
#[derive(Debug, Clone)]
pub struct CallSession {
    scenario_id: String,
    state: CallState,
    transcript: Option<TranscriptLine>,
    last_error: Option<String>,
}

impl CallSession {
    /// Creates an idle session for a scenario.
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            state: CallState::Idle,
            transcript: None,
            last_error: None,
        }
    }

    /// Scenario this call is for.
    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    /// Current state.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Most recent final transcript line.
    pub fn transcript(&self) -> Option<&TranscriptLine> {
        self.transcript.as_ref()
    }

    /// Reason for the last failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns true while the start button should show a spinner.
    pub fn is_loading(&self) -> bool {
        self.state == CallState::Connecting
    }

    /// The transition function.
    ///
    /// Late SDK callbacks (`call-end`, `error`, messages) after the call is
    /// over are absorbed without effects. Anything else that does not fit
    /// the current state is rejected.
    pub fn apply(&mut self, event: CallEvent) -> Result<Vec<Effect>, CallError> {
        use CallEvent as E;
        use CallState as S;

        let name = event.name();

        let effects = match (self.state, event) {
            (S::Idle, E::StartRequested) => {
                self.state = S::Connecting;
                self.last_error = None;
                vec![Effect::RequestStart {
                    scenario_id: self.scenario_id.clone(),
                }]
            },
            (S::Connecting, E::StartAccepted(config)) => vec![Effect::StartSdk(config)],
            (S::Connecting, E::StartRejected { status }) => {
                self.fail(format!("start rejected with status {status}"));
                vec![Effect::Navigate(Navigation::Back)]
            },
            (S::Connecting, E::StartFailed(reason)) => {
                self.fail(reason);
                vec![Effect::Navigate(Navigation::To(SCENARIO_ROUTE.to_string()))]
            },
            (S::Connecting, E::CallStarted) => {
                self.state = S::Active;
                vec![]
            },
            (S::Active, E::Message(message)) => {
                if let SdkMessage::Transcript {
                    role,
                    transcript_type: TranscriptKind::Final,
                    transcript,
                } = message
                {
                    self.transcript = Some(TranscriptLine {
                        role,
                        text: transcript,
                    });
                }
                vec![]
            },
            (state, E::CallEnded) if state.is_live() => {
                self.state = S::Ended;
                vec![Effect::Navigate(Navigation::Back)]
            },
            (state, E::SdkError(reason)) if state.is_live() => {
                self.fail(reason);
                vec![Effect::Navigate(Navigation::To(SCENARIO_ROUTE.to_string()))]
            },
            (state, E::StopRequested) if state.is_live() => {
                self.state = S::Ended;
                vec![
                    Effect::StopSdk,
                    Effect::Navigate(Navigation::To(SCENARIO_ROUTE.to_string())),
                ]
            },
            (state, E::Dispose) if state.is_live() => {
                self.state = S::Ended;
                vec![Effect::StopSdk]
            },
            (_, E::Dispose) => vec![],
            (S::Connecting, E::Message(_)) => vec![],
            (state, E::CallEnded | E::SdkError(_) | E::Message(_)) if state.is_terminal() => {
                vec![]
            },
            (state, _) => {
                return Err(CallError::InvalidTransition { state, event: name });
            },
        };

        Ok(effects)
    }

    fn fail(&mut self, reason: String) {
        self.state = CallState::Errored;
        self.last_error = Some(reason);
    }
}
