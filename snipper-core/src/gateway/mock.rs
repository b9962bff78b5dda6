//! Scripted gateway for tests and dry runs
//!
//! MockGateway replays queued status frames so the controller can be driven
//! through any sequence of remote states without a runner. Every call is
//! recorded, and the number of polls in flight at once is tracked so tests
//! can check that polls never overlap.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::ExecutionGateway;
use super::types::{RemoteStatus, StartRequest, StatusFrame};
use crate::error::TransportError;

/// A call observed by the mock, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Start {
        snippet_id: String,
        request: StartRequest,
    },
    Poll {
        snippet_id: String,
    },
    Input {
        snippet_id: String,
        input: String,
    },
    Cancel {
        snippet_id: String,
    },
}

#[derive(Default)]
struct MockState {
    start_results: VecDeque<Result<StatusFrame, TransportError>>,
    poll_results: VecDeque<Result<StatusFrame, TransportError>>,
    input_results: VecDeque<Result<(), TransportError>>,
    cancel_results: VecDeque<Result<(), TransportError>>,
    calls: Vec<GatewayCall>,
    polls_in_flight: usize,
    max_polls_in_flight: usize,
}

/// In-memory implementation of ExecutionGateway
///
/// With nothing queued, `start` reports `STARTED`, `poll_status` reports
/// `OUTPUT` without lines, and input/cancel succeed.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
    latency: Option<Duration>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before answering
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Gateway that plays a short interactive program: greets, asks for a
    /// name, echoes it, then completes.
    pub fn demo() -> Self {
        let gateway = Self::new();
        gateway.queue_start(StatusFrame::new(
            RemoteStatus::Started,
            ["Execution started"],
        ));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Output, ["Hello!"]));
        gateway.queue_poll(StatusFrame::new(
            RemoteStatus::Waiting,
            ["What is your name?"],
        ));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Output, ["Nice to meet you."]));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Completed, ["Bye."]));
        gateway
    }

    pub fn queue_start(&self, frame: StatusFrame) {
        self.lock().start_results.push_back(Ok(frame));
    }

    pub fn queue_start_error(&self, error: TransportError) {
        self.lock().start_results.push_back(Err(error));
    }

    pub fn queue_poll(&self, frame: StatusFrame) {
        self.lock().poll_results.push_back(Ok(frame));
    }

    pub fn queue_poll_error(&self, error: TransportError) {
        self.lock().poll_results.push_back(Err(error));
    }

    pub fn queue_input_error(&self, error: TransportError) {
        self.lock().input_results.push_back(Err(error));
    }

    pub fn queue_cancel_error(&self, error: TransportError) {
        self.lock().cancel_results.push_back(Err(error));
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    /// Number of `poll_status` calls received so far
    pub fn poll_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, GatewayCall::Poll { .. }))
            .count()
    }

    /// Highest number of `poll_status` calls that were in flight together
    pub fn max_polls_in_flight(&self) -> usize {
        self.lock().max_polls_in_flight
    }

    /// Number of poll frames still queued
    pub fn queued_polls(&self) -> usize {
        self.lock().poll_results.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ExecutionGateway for MockGateway {
    async fn start(
        &self,
        snippet_id: &str,
        request: &StartRequest,
    ) -> Result<StatusFrame, TransportError> {
        self.lock().calls.push(GatewayCall::Start {
            snippet_id: snippet_id.to_string(),
            request: request.clone(),
        });
        self.simulate_latency().await;
        self.lock()
            .start_results
            .pop_front()
            .unwrap_or_else(|| Ok(StatusFrame::empty(RemoteStatus::Started)))
    }

    async fn poll_status(&self, snippet_id: &str) -> Result<StatusFrame, TransportError> {
        {
            let mut state = self.lock();
            state.calls.push(GatewayCall::Poll {
                snippet_id: snippet_id.to_string(),
            });
            state.polls_in_flight += 1;
            state.max_polls_in_flight = state.max_polls_in_flight.max(state.polls_in_flight);
        }
        self.simulate_latency().await;
        let mut state = self.lock();
        state.polls_in_flight -= 1;
        state
            .poll_results
            .pop_front()
            .unwrap_or_else(|| Ok(StatusFrame::empty(RemoteStatus::Output)))
    }

    async fn send_input(&self, snippet_id: &str, input: &str) -> Result<(), TransportError> {
        self.lock().calls.push(GatewayCall::Input {
            snippet_id: snippet_id.to_string(),
            input: input.to_string(),
        });
        self.simulate_latency().await;
        self.lock().input_results.pop_front().unwrap_or(Ok(()))
    }

    async fn cancel(&self, snippet_id: &str) -> Result<(), TransportError> {
        self.lock().calls.push(GatewayCall::Cancel {
            snippet_id: snippet_id.to_string(),
        });
        self.simulate_latency().await;
        self.lock().cancel_results.pop_front().unwrap_or(Ok(()))
    }
}
