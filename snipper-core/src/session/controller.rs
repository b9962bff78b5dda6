//! SessionController: drives one execution session against a gateway
//!
//! The controller owns the session, the poll task and the event channel.
//! Session state sits behind an async mutex that is only held while a frame
//! or a local transition is applied, never across a gateway call, so a
//! cancel can always get in while a poll is on the wire.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::{ExecutionSession, FrameOutcome, SessionState};
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::gateway::{ExecutionGateway, StartRequest};
use crate::view::SessionView;

/// Default delay between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest delay allowed between two polls; smaller intervals are raised to it
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Tuning for a SessionController
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Delay between the end of one poll and the start of the next
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

struct Shared {
    snippet_id: String,
    execution_id: Uuid,
    gateway: Arc<dyn ExecutionGateway>,
    session: Mutex<ExecutionSession>,
    events: broadcast::Sender<SessionEvent>,
    config: ControllerConfig,
    shutdown: CancellationToken,
}

impl Shared {
    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn publish_state(&self, state: &SessionState) {
        self.publish(SessionEvent::StateChanged {
            snippet_id: self.snippet_id.clone(),
            state: state.clone(),
        });
    }

    fn publish_outcome(&self, outcome: &FrameOutcome) {
        if !outcome.appended.is_empty() {
            self.publish(SessionEvent::Output {
                snippet_id: self.snippet_id.clone(),
                lines: outcome.appended.clone(),
            });
        }
        if let Some(state) = &outcome.transitioned_to {
            self.publish_state(state);
        }
    }
}

/// Controller for a single execution session
pub struct SessionController {
    shared: Arc<Shared>,
    poller: StdMutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Create an idle controller for `snippet_id`.
    ///
    /// A poll interval below `MIN_POLL_INTERVAL` is raised to it.
    pub fn new(
        snippet_id: impl Into<String>,
        gateway: Arc<dyn ExecutionGateway>,
        mut config: ControllerConfig,
    ) -> Self {
        config.poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);
        let session = ExecutionSession::new(snippet_id);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                snippet_id: session.snippet_id().to_string(),
                execution_id: session.execution_id(),
                gateway,
                session: Mutex::new(session),
                events,
                config,
                shutdown: CancellationToken::new(),
            }),
            poller: StdMutex::new(None),
        }
    }

    pub fn snippet_id(&self) -> &str {
        &self.shared.snippet_id
    }

    pub fn execution_id(&self) -> Uuid {
        self.shared.execution_id
    }

    /// Subscribe to state changes, output and poll failures
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Copy of the session as it is now
    pub async fn snapshot(&self) -> ExecutionSession {
        self.shared.session.lock().await.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.shared.session.lock().await.state().clone()
    }

    /// Render-ready projection of the session
    pub async fn view(&self) -> SessionView {
        SessionView::project(&*self.shared.session.lock().await)
    }

    /// Whether a poll task is currently alive
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start the remote execution.
    ///
    /// Only legal from `Idle`. The start response is applied like a poll
    /// frame; polling begins if the session ends up `Running`. A failed start
    /// leaves the session `Failed` and returns the gateway error.
    pub async fn start(&self, request: &StartRequest) -> Result<(), SessionError> {
        let shared = &self.shared;
        {
            let mut session = shared.session.lock().await;
            session.begin_start()?;
            shared.publish_state(session.state());
        }
        info!(
            snippet_id = %shared.snippet_id,
            execution_id = %shared.execution_id,
            version = %request.version,
            "Starting execution"
        );

        let result = shared.gateway.start(&shared.snippet_id, request).await;

        let frame = match result {
            Ok(frame) => frame,
            Err(err) => {
                error!(
                    snippet_id = %shared.snippet_id,
                    execution_id = %shared.execution_id,
                    error = %err,
                    "Execution failed to start"
                );
                let mut session = shared.session.lock().await;
                if session.transition(SessionState::Failed {
                    message: err.to_string(),
                }) {
                    shared.publish_state(session.state());
                }
                return Err(err.into());
            }
        };

        let begin_polling = {
            let mut session = shared.session.lock().await;
            if *session.state() != SessionState::Starting {
                None
            } else {
                let outcome = session.apply_frame(frame);
                shared.publish_outcome(&outcome);
                Some(*session.state() == SessionState::Running)
            }
        };

        match begin_polling {
            Some(true) => self.spawn_poller(),
            Some(false) => {}
            None => {
                // Cancelled while the start request was in flight; the runner
                // may have launched the process after seeing our cancel.
                debug!(
                    snippet_id = %shared.snippet_id,
                    "Start resolved after cancel, cancelling again"
                );
                if let Err(err) = shared.gateway.cancel(&shared.snippet_id).await {
                    warn!(
                        snippet_id = %shared.snippet_id,
                        error = %err,
                        "Follow-up cancel failed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Send one line of program input.
    ///
    /// Rejected locally unless the session is `WaitingForInput` with no other
    /// input awaiting acknowledgement. On acknowledgement the session resumes
    /// `Running` and polling restarts; on failure it stays waiting.
    pub async fn submit_input(&self, input: &str) -> Result<(), SessionError> {
        let shared = &self.shared;
        shared.session.lock().await.begin_input(input)?;
        debug!(snippet_id = %shared.snippet_id, "Sending input");

        let result = shared.gateway.send_input(&shared.snippet_id, input).await;

        let resumed = {
            let mut session = shared.session.lock().await;
            let resumed = session.finish_input(result.is_ok());
            if resumed {
                shared.publish_state(session.state());
            }
            resumed
        };

        if let Err(err) = result {
            warn!(
                snippet_id = %shared.snippet_id,
                error = %err,
                "Input was not acknowledged"
            );
            return Err(err.into());
        }
        if resumed {
            self.spawn_poller();
        }
        Ok(())
    }

    /// Cancel the execution.
    ///
    /// The session becomes `Cancelled` and polling stops before the remote
    /// side is contacted, so the local outcome does not depend on the cancel
    /// request succeeding. An `Idle` session is cancelled without a request.
    /// Cancelling a terminated session does nothing.
    pub async fn cancel(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        let previous = {
            let mut session = shared.session.lock().await;
            let previous = session.state().clone();
            if previous.is_terminal() {
                debug!(
                    snippet_id = %shared.snippet_id,
                    state = %previous,
                    "Cancel on terminated session ignored"
                );
                return Ok(());
            }
            session.transition(SessionState::Cancelled);
            shared.publish_state(session.state());
            previous
        };
        shared.shutdown.cancel();
        info!(
            snippet_id = %shared.snippet_id,
            execution_id = %shared.execution_id,
            from = %previous,
            "Execution cancelled"
        );

        if previous == SessionState::Idle {
            return Ok(());
        }
        shared
            .gateway
            .cancel(&shared.snippet_id)
            .await
            .map_err(|err| {
                warn!(
                    snippet_id = %shared.snippet_id,
                    error = %err,
                    "Cancel request failed"
                );
                SessionError::from(err)
            })
    }

    /// Stop polling without touching the session or the remote side
    pub fn dispose(&self) {
        self.shared.shutdown.cancel();
        if let Some(handle) = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    fn spawn_poller(&self) {
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(poll_loop(shared));
        // Any previous loop has already decided to stop; its handle is just dropped
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("snippet_id", &self.shared.snippet_id)
            .field("execution_id", &self.shared.execution_id)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Poll until the session leaves `Running` or the controller shuts down.
///
/// The next poll is only scheduled once the previous one has been applied,
/// and the decision to stop is taken under the same lock as the transition
/// that caused it.
async fn poll_loop(shared: Arc<Shared>) {
    debug!(snippet_id = %shared.snippet_id, "Poll loop started");
    loop {
        tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            _ = tokio::time::sleep(shared.config.poll_interval) => {}
        }

        if *shared.session.lock().await.state() != SessionState::Running {
            break;
        }

        let result = tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            result = shared.gateway.poll_status(&shared.snippet_id) => result,
        };

        let mut session = shared.session.lock().await;
        match result {
            Ok(frame) => {
                debug!(
                    snippet_id = %shared.snippet_id,
                    status = ?frame.status,
                    lines = frame.message.len(),
                    "Status frame"
                );
                let outcome = session.apply_frame(frame);
                if outcome.discarded {
                    debug!(
                        snippet_id = %shared.snippet_id,
                        state = %session.state(),
                        "Status frame arrived after the session moved on, discarded"
                    );
                }
                shared.publish_outcome(&outcome);
            }
            Err(err) if *session.state() == SessionState::Running => {
                warn!(
                    snippet_id = %shared.snippet_id,
                    error = %err,
                    "Status poll failed, retrying on next tick"
                );
                session.record_poll_error(&err);
                shared.publish(SessionEvent::PollFailed {
                    snippet_id: shared.snippet_id.clone(),
                    error: err.to_string(),
                });
            }
            Err(_) => {}
        }

        if *session.state() != SessionState::Running {
            break;
        }
    }
    debug!(snippet_id = %shared.snippet_id, "Poll loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::gateway::{GatewayCall, MockGateway, RemoteStatus, StatusFrame};

    fn controller(gateway: &Arc<MockGateway>) -> SessionController {
        SessionController::new("snippet-1", gateway.clone(), ControllerConfig::default())
    }

    async fn wait_for_state(controller: &SessionController, expected: SessionState) {
        for _ in 0..600 {
            if controller.state().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!(
            "session never reached {}, stuck in {}",
            expected,
            controller.state().await
        );
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // ==================== Start Tests ====================

    #[tokio::test(start_paused = true)]
    async fn start_moves_to_running_and_polls() {
        let gateway = Arc::new(MockGateway::new());
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        assert_eq!(controller.state().await, SessionState::Running);
        assert!(controller.is_polling());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(gateway.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_only_legal_from_idle() {
        let gateway = Arc::new(MockGateway::new());
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        let err = controller.start(&StartRequest::new("1.1")).await.unwrap_err();

        assert!(matches!(err, SessionError::InvalidState { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_fails_session_without_polling() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start_error(TransportError::Http {
            status: 500,
            body: "runner down".to_string(),
        });
        let controller = controller(&gateway);

        let err = controller.start(&StartRequest::new("1.1")).await.unwrap_err();

        assert!(matches!(err, SessionError::Gateway(_)));
        match controller.state().await {
            SessionState::Failed { message } => assert!(message.contains("runner down")),
            other => panic!("expected Failed, got {}", other),
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(gateway.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_frame_lines_are_kept() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start(StatusFrame::new(RemoteStatus::Started, ["Execution started"]));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.output_log(), ["Execution started".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn start_frame_waiting_skips_polling() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start(StatusFrame::new(RemoteStatus::Waiting, ["Input:"]));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(controller.state().await, SessionState::WaitingForInput);
        assert_eq!(gateway.poll_count(), 0);
    }

    // ==================== Polling Tests ====================

    #[tokio::test(start_paused = true)]
    async fn running_then_waiting_scenario() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Output, ["a"]));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Waiting, ["b"]));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        wait_for_state(&controller, SessionState::WaitingForInput).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.output_log(), ["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_polling_while_waiting_for_input() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Waiting, ["?"]));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        wait_for_state(&controller, SessionState::WaitingForInput).await;
        let polls = gateway.poll_count();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(gateway.poll_count(), polls);
        assert!(!controller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_stops_polling_permanently() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Completed, ["done"]));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        wait_for_state(&controller, SessionState::Completed).await;
        let polls = gateway.poll_count();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(gateway.poll_count(), polls);
        let snapshot = controller.snapshot().await;
        assert!(snapshot.output_log().contains(&"done".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn error_frame_fails_session() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Error, ["Segmentation fault"]));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();

        wait_for_state(
            &controller,
            SessionState::Failed {
                message: "Segmentation fault".to_string(),
            },
        )
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_is_absorbed_and_retried() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_poll_error(TransportError::Network("connection reset".to_string()));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Output, ["after retry"]));
        let controller = controller(&gateway);
        let mut rx = controller.subscribe();

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.state(), &SessionState::Running);
        let failure = snapshot.last_poll_error().unwrap();
        assert!(failure.message.contains("connection reset"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(gateway.poll_count(), 2);
        assert_eq!(snapshot.output_log(), ["after retry".to_string()]);

        let events = drain(&mut rx);
        assert!(
            events
                .iter()
                .any(|event| matches!(event, SessionEvent::PollFailed { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn never_two_polls_in_flight() {
        let gateway = Arc::new(MockGateway::new().with_latency(Duration::from_secs(3)));
        for line in ["1", "2", "3", "4"] {
            gateway.queue_poll(StatusFrame::new(RemoteStatus::Output, [line]));
        }
        gateway.queue_poll(StatusFrame::empty(RemoteStatus::Completed));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        wait_for_state(&controller, SessionState::Completed).await;

        assert_eq!(gateway.max_polls_in_flight(), 1);
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.output_log(), ["1", "2", "3", "4"].map(String::from));
    }

    // ==================== Input Tests ====================

    #[tokio::test(start_paused = true)]
    async fn acknowledged_input_resumes_polling() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Waiting, ["Enter a number:"]));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Completed, ["You typed 42"]));
        let controller = controller(&gateway);

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        wait_for_state(&controller, SessionState::WaitingForInput).await;

        controller.submit_input("42").await.unwrap();
        assert_eq!(controller.state().await, SessionState::Running);
        assert!(controller.is_polling());

        wait_for_state(&controller, SessionState::Completed).await;
        assert!(gateway.calls().contains(&GatewayCall::Input {
            snippet_id: "snippet-1".to_string(),
            input: "42".to_string(),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn input_rejected_while_running_without_network_call() {
        let gateway = Arc::new(MockGateway::new());
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        let err = controller.submit_input("42").await.unwrap_err();

        assert!(matches!(err, SessionError::InvalidState { .. }));
        assert!(
            !gateway
                .calls()
                .iter()
                .any(|call| matches!(call, GatewayCall::Input { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_input_stays_waiting_and_can_be_retried() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start(StatusFrame::empty(RemoteStatus::Waiting));
        gateway.queue_input_error(TransportError::Network("timeout".to_string()));
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        let err = controller.submit_input("42").await.unwrap_err();
        assert!(matches!(err, SessionError::Gateway(_)));
        assert_eq!(controller.state().await, SessionState::WaitingForInput);
        assert!(!controller.is_polling());

        controller.submit_input("42").await.unwrap();
        assert_eq!(controller.state().await, SessionState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_input_is_rejected_while_first_is_in_flight() {
        let gateway = Arc::new(MockGateway::new().with_latency(Duration::from_secs(2)));
        gateway.queue_start(StatusFrame::empty(RemoteStatus::Waiting));
        let controller = Arc::new(controller(&gateway));
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit_input("first").await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;

        let err = controller.submit_input("second").await.unwrap_err();
        assert!(matches!(err, SessionError::InputInFlight(_)));

        first.await.unwrap().unwrap();
        assert_eq!(controller.state().await, SessionState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn no_poll_while_input_awaits_acknowledgement() {
        let gateway = Arc::new(MockGateway::new().with_latency(Duration::from_secs(5)));
        gateway.queue_start(StatusFrame::empty(RemoteStatus::Waiting));
        let controller = Arc::new(controller(&gateway));
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        let send = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit_input("42").await })
        };
        // Several poll intervals pass while the input is on the wire
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(gateway.poll_count(), 0);
        assert!(!controller.is_polling());

        send.await.unwrap().unwrap();
        assert_eq!(controller.state().await, SessionState::Running);
        assert!(controller.is_polling());
    }

    // ==================== Cancel Tests ====================

    #[tokio::test(start_paused = true)]
    async fn cancel_from_idle_does_not_contact_runner() {
        let gateway = Arc::new(MockGateway::new());
        let controller = controller(&gateway);

        controller.cancel().await.unwrap();

        assert_eq!(controller.state().await, SessionState::Cancelled);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_waiting_stops_session() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start(StatusFrame::empty(RemoteStatus::Waiting));
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        controller.cancel().await.unwrap();

        assert_eq!(controller.state().await, SessionState::Cancelled);
        assert_eq!(
            gateway.calls().last(),
            Some(&GatewayCall::Cancel {
                snippet_id: "snippet-1".to_string()
            })
        );
        let err = controller.submit_input("late").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_failure_is_surfaced_but_session_stays_cancelled() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_cancel_error(TransportError::Http {
            status: 503,
            body: "busy".to_string(),
        });
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        let err = controller.cancel().await.unwrap_err();

        assert!(matches!(err, SessionError::Gateway(_)));
        assert_eq!(controller.state().await, SessionState::Cancelled);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(gateway.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_completion_is_noop() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start(StatusFrame::new(RemoteStatus::Completed, ["done"]));
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        controller.cancel().await.unwrap();

        assert_eq!(controller.state().await, SessionState::Completed);
        assert!(
            !gateway
                .calls()
                .iter()
                .any(|call| matches!(call, GatewayCall::Cancel { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wins_over_in_flight_poll() {
        let gateway = Arc::new(MockGateway::new().with_latency(Duration::from_secs(5)));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Completed, ["too late"]));
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        // Poll is issued after one interval and takes five seconds to answer
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(gateway.poll_count(), 1);

        controller.cancel().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.state(), &SessionState::Cancelled);
        assert!(snapshot.output_log().is_empty());
        assert!(!controller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn start_resolving_after_cancel_is_discarded() {
        let gateway = Arc::new(MockGateway::new().with_latency(Duration::from_secs(2)));
        gateway.queue_start(StatusFrame::new(RemoteStatus::Started, ["started"]));
        let controller = Arc::new(controller(&gateway));

        let start = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start(&StartRequest::new("1.1")).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        controller.cancel().await.unwrap();
        start.await.unwrap().unwrap();

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.state(), &SessionState::Cancelled);
        assert!(snapshot.output_log().is_empty());
        assert_eq!(gateway.poll_count(), 0);
    }

    // ==================== Events & Lifecycle Tests ====================

    #[tokio::test(start_paused = true)]
    async fn events_follow_the_session() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start(StatusFrame::new(RemoteStatus::Started, ["hello"]));
        gateway.queue_poll(StatusFrame::new(RemoteStatus::Completed, ["bye"]));
        let controller = controller(&gateway);
        let mut rx = controller.subscribe();

        controller.start(&StartRequest::new("1.1")).await.unwrap();
        wait_for_state(&controller, SessionState::Completed).await;

        let id = "snippet-1".to_string();
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::StateChanged {
                    snippet_id: id.clone(),
                    state: SessionState::Starting,
                },
                SessionEvent::Output {
                    snippet_id: id.clone(),
                    lines: vec!["hello".to_string()],
                },
                SessionEvent::StateChanged {
                    snippet_id: id.clone(),
                    state: SessionState::Running,
                },
                SessionEvent::Output {
                    snippet_id: id.clone(),
                    lines: vec!["bye".to_string()],
                },
                SessionEvent::StateChanged {
                    snippet_id: id,
                    state: SessionState::Completed,
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_polling_without_cancel_request() {
        let gateway = Arc::new(MockGateway::new());
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        controller.dispose();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!controller.is_polling());
        assert_eq!(gateway.poll_count(), 0);
        assert!(
            !gateway
                .calls()
                .iter()
                .any(|call| matches!(call, GatewayCall::Cancel { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_stops_poll_task() {
        let gateway = Arc::new(MockGateway::new());
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        drop(controller);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(gateway.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_poll_interval_is_raised_to_minimum() {
        let gateway = Arc::new(MockGateway::new());
        let controller = SessionController::new(
            "snippet-1",
            gateway.clone(),
            ControllerConfig {
                poll_interval: Duration::ZERO,
            },
        );
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        tokio::time::sleep(MIN_POLL_INTERVAL * 5 + Duration::from_millis(50)).await;

        let polls = gateway.poll_count();
        assert!((1..=5).contains(&polls), "{} polls in five intervals", polls);
        controller.dispose();
    }

    #[tokio::test]
    async fn view_reflects_session() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_start(StatusFrame::new(RemoteStatus::Waiting, ["Name?"]));
        let controller = controller(&gateway);
        controller.start(&StartRequest::new("1.1")).await.unwrap();

        let view = controller.view().await;

        assert_eq!(view.output, "Name?");
        assert!(view.input_enabled);
        assert!(view.banner.is_none());
    }
}
