//! ExecutionSession and its state machine
//!
//! Everything here is synchronous: the controller takes the session lock,
//! calls one of these methods, and releases the lock before touching the
//! network again. Keeping the transitions pure makes the invariants easy to
//! check in isolation:
//!
//! - the output log only grows
//! - terminal states (`Completed`, `Failed`, `Cancelled`) are never left
//! - input is only accepted in `WaitingForInput`, one submission at a time

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{SessionError, TransportError};
use crate::gateway::{RemoteStatus, StatusFrame};

/// State of an execution session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing sent yet
    Idle,
    /// Start request in flight
    Starting,
    /// Remote process running; the controller polls
    Running,
    /// Remote process blocked on input; polling paused
    WaitingForInput,
    /// Remote process finished
    Completed,
    /// Start was rejected or the remote process failed
    Failed { message: String },
    /// Cancelled by the client
    Cancelled,
}

impl SessionState {
    /// Whether no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed { .. } | SessionState::Cancelled
        )
    }

    /// Variant name without payload
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Starting => "Starting",
            SessionState::Running => "Running",
            SessionState::WaitingForInput => "WaitingForInput",
            SessionState::Completed => "Completed",
            SessionState::Failed { .. } => "Failed",
            SessionState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Failed { message } => write!(f, "Failed ({})", message),
            other => f.write_str(other.name()),
        }
    }
}

/// Most recent poll failure, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollFailure {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// What applying one status frame did to the session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameOutcome {
    /// Lines appended to the output log
    pub appended: Vec<String>,
    /// New state, if the frame caused a transition
    pub transitioned_to: Option<SessionState>,
    /// The frame arrived in a state that no longer accepts frames
    pub discarded: bool,
}

/// One run of one snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSession {
    execution_id: Uuid,
    snippet_id: String,
    state: SessionState,
    output_log: Vec<String>,
    pending_input: Option<String>,
    last_poll_error: Option<PollFailure>,
}

impl ExecutionSession {
    /// Create an idle session for `snippet_id`
    pub fn new(snippet_id: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            snippet_id: snippet_id.into(),
            state: SessionState::Idle,
            output_log: Vec::new(),
            pending_input: None,
            last_poll_error: None,
        }
    }

    /// Client-side id used to correlate logs of this run
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn snippet_id(&self) -> &str {
        &self.snippet_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn output_log(&self) -> &[String] {
        &self.output_log
    }

    /// Input submitted but not yet acknowledged by the runner
    pub fn pending_input(&self) -> Option<&str> {
        self.pending_input.as_deref()
    }

    pub fn last_poll_error(&self) -> Option<&PollFailure> {
        self.last_poll_error.as_ref()
    }

    /// Move to `next` unless the session already terminated.
    ///
    /// Returns whether the transition was applied.
    pub(crate) fn transition(&mut self, next: SessionState) -> bool {
        if self.state.is_terminal() {
            debug!(
                snippet_id = %self.snippet_id,
                current = %self.state,
                rejected = %next,
                "Ignoring transition out of terminal state"
            );
            return false;
        }
        if self.state == next {
            return false;
        }
        debug!(
            snippet_id = %self.snippet_id,
            execution_id = %self.execution_id,
            from = %self.state,
            to = %next,
            "Session state transition"
        );
        if next != SessionState::WaitingForInput {
            self.pending_input = None;
        }
        self.state = next;
        true
    }

    /// `Idle -> Starting`
    pub(crate) fn begin_start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                expected: SessionState::Idle.name().to_string(),
                actual: self.state.name().to_string(),
            });
        }
        self.transition(SessionState::Starting);
        Ok(())
    }

    /// Apply a status frame from `start` or `poll_status`.
    ///
    /// Frames are only accepted while `Starting` or `Running`; anywhere else
    /// they are discarded whole. Lines are appended before the status is
    /// applied so output delivered together with a terminal status is kept.
    pub(crate) fn apply_frame(&mut self, frame: StatusFrame) -> FrameOutcome {
        if !matches!(self.state, SessionState::Starting | SessionState::Running) {
            return FrameOutcome {
                discarded: true,
                ..FrameOutcome::default()
            };
        }

        let next = match frame.status {
            RemoteStatus::Started | RemoteStatus::Output => SessionState::Running,
            RemoteStatus::Waiting => SessionState::WaitingForInput,
            RemoteStatus::Completed => SessionState::Completed,
            RemoteStatus::Error => SessionState::Failed {
                message: frame
                    .message
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "remote execution reported an error".to_string()),
            },
        };

        self.output_log.extend(frame.message.iter().cloned());
        let transitioned_to = self.transition(next).then(|| self.state.clone());

        FrameOutcome {
            appended: frame.message,
            transitioned_to,
            discarded: false,
        }
    }

    /// Remember a transient poll failure; state is left alone
    pub(crate) fn record_poll_error(&mut self, error: &TransportError) {
        self.last_poll_error = Some(PollFailure {
            message: error.to_string(),
            at: Utc::now(),
        });
    }

    /// Buffer `input` for sending; only legal in `WaitingForInput`
    pub(crate) fn begin_input(&mut self, input: &str) -> Result<(), SessionError> {
        if self.state != SessionState::WaitingForInput {
            return Err(SessionError::InvalidState {
                expected: SessionState::WaitingForInput.name().to_string(),
                actual: self.state.name().to_string(),
            });
        }
        if self.pending_input.is_some() {
            return Err(SessionError::InputInFlight(self.snippet_id.clone()));
        }
        self.pending_input = Some(input.to_string());
        Ok(())
    }

    /// Settle the pending input.
    ///
    /// An acknowledged send resumes `Running`; a failed one leaves the session
    /// waiting so the caller can submit again. Returns whether the session
    /// resumed.
    pub(crate) fn finish_input(&mut self, acknowledged: bool) -> bool {
        self.pending_input = None;
        if acknowledged && self.state == SessionState::WaitingForInput {
            return self.transition(SessionState::Running);
        }
        false
    }
}
