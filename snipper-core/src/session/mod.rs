//! Execution session management
//!
//! This module provides:
//! - [`ExecutionSession`] and [`SessionState`]: one run and its state machine
//! - [`SessionController`]: drives a session (start, poll, input, cancel)
//! - [`SessionManager`]: one controller per snippet

pub mod controller;
pub mod manager;
pub mod state;

pub use controller::{
    ControllerConfig, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, SessionController,
};
pub use manager::SessionManager;
pub use state::{ExecutionSession, FrameOutcome, PollFailure, SessionState};
