//! snipper-core: Core library for interactive remote snippet execution
//!
//! This crate provides the building blocks for running a stored snippet on a
//! remote runner and talking to it while it runs:
//!
//! - **Transport** - [`HttpTransport`] for authenticated JSON requests
//! - **Execution gateway** - [`ExecutionGateway`] trait with the HTTP
//!   implementation [`HttpExecutionGateway`] and the scripted [`MockGateway`]
//! - **Session control** - [`SessionController`] drives one execution through
//!   start, polling, input and cancellation; [`SessionManager`] keeps one per
//!   snippet
//! - **View** - [`SessionView`] projects a session for rendering
//! - **Rules** - [`RulesClient`] for server-side formatting and linting
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use snipper_core::{
//!     ControllerConfig, HttpExecutionGateway, HttpTransport, SessionController,
//!     StartRequest, StaticCredentials,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(
//!         "http://localhost:8080/api/v1",
//!         Arc::new(StaticCredentials::new("token")),
//!     );
//!     let gateway = Arc::new(HttpExecutionGateway::new(transport, "user-1"));
//!     let controller = SessionController::new("snippet-1", gateway, ControllerConfig::default());
//!
//!     controller.start(&StartRequest::new("1.1")).await?;
//!     println!("{}", controller.view().await.status_label);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────────┐     ┌───────────────┐
//! │  SessionManager  │────▶│ SessionController  │────▶│ExecutionGateway│
//! └──────────────────┘     │  state machine     │     └───────┬───────┘
//!                          │  poll task         │             │
//!                          │  event broadcast   │     ┌───────▼───────┐
//!                          └─────────┬──────────┘     │ HttpTransport │
//!                                    │                └───────────────┘
//!                          ┌─────────▼──────────┐
//!                          │    SessionView     │
//!                          └────────────────────┘
//! ```

pub mod error;
pub mod events;
pub mod gateway;
pub mod rules;
pub mod session;
pub mod transport;
pub mod view;

// Re-export key types for convenience
pub use error::{SessionError, TransportError};
pub use events::SessionEvent;
pub use gateway::{
    ExecutionGateway, GatewayCall, HttpExecutionGateway, MockGateway, RemoteStatus, StartRequest,
    StatusFrame,
};
pub use rules::{LintIssue, LintReport, RulesClient};
pub use session::{
    ControllerConfig, ExecutionSession, PollFailure, SessionController, SessionManager,
    SessionState,
};
pub use transport::{BearerToken, CredentialProvider, HttpTransport, StaticCredentials};
pub use view::SessionView;
