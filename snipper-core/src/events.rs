//! Events published by a session controller
//!
//! Front ends subscribe to a controller instead of re-reading its state: every
//! state change, every batch of new output lines and every absorbed poll
//! failure is broadcast once, in the order it was applied.

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// Something that happened to one execution session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session moved to a new state
    StateChanged {
        snippet_id: String,
        state: SessionState,
    },
    /// New lines were appended to the output log
    Output {
        snippet_id: String,
        lines: Vec<String>,
    },
    /// A status poll failed; the session keeps its state and polls again
    PollFailed { snippet_id: String, error: String },
}

impl SessionEvent {
    /// Snippet the event belongs to
    pub fn snippet_id(&self) -> &str {
        match self {
            SessionEvent::StateChanged { snippet_id, .. }
            | SessionEvent::Output { snippet_id, .. }
            | SessionEvent::PollFailed { snippet_id, .. } => snippet_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_id_is_exposed_for_every_variant() {
        let events = vec![
            SessionEvent::StateChanged {
                snippet_id: "s1".to_string(),
                state: SessionState::Running,
            },
            SessionEvent::Output {
                snippet_id: "s1".to_string(),
                lines: vec!["a".to_string()],
            },
            SessionEvent::PollFailed {
                snippet_id: "s1".to_string(),
                error: "timeout".to_string(),
            },
        ];

        for event in events {
            assert_eq!(event.snippet_id(), "s1");
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SessionEvent::Output {
            snippet_id: "s1".to_string(),
            lines: vec!["hello".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "output");
        assert_eq!(json["lines"][0], "hello");
    }
}
