//! Session view: what a front end needs to render an execution

use serde::Serialize;

use crate::session::{ExecutionSession, SessionState};

pub const FINISHED_BANNER: &str = "Execution finished.";
pub const FAILED_BANNER: &str = "Execution failed.";
pub const CANCELLED_BANNER: &str = "Execution cancelled.";

/// Read-only projection of an ExecutionSession
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    /// Whole output so far, one line per log entry
    pub output: String,
    /// Whether the input field should accept a submission
    pub input_enabled: bool,
    /// Closing banner once the session has terminated
    pub banner: Option<&'static str>,
    pub status_label: &'static str,
}

impl SessionView {
    pub fn project(session: &ExecutionSession) -> Self {
        let state = session.state();
        Self {
            output: session.output_log().join("\n"),
            input_enabled: *state == SessionState::WaitingForInput,
            banner: banner(state),
            status_label: status_label(state),
        }
    }
}

fn banner(state: &SessionState) -> Option<&'static str> {
    match state {
        SessionState::Completed => Some(FINISHED_BANNER),
        SessionState::Failed { .. } => Some(FAILED_BANNER),
        SessionState::Cancelled => Some(CANCELLED_BANNER),
        _ => None,
    }
}

fn status_label(state: &SessionState) -> &'static str {
    match state {
        SessionState::Idle => "idle",
        SessionState::Starting => "starting",
        SessionState::Running => "running",
        SessionState::WaitingForInput => "waiting for input",
        SessionState::Completed => "completed",
        SessionState::Failed { .. } => "failed",
        SessionState::Cancelled => "cancelled",
    }
}
