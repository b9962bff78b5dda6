//! ExecutionGateway trait
//!
//! The gateway is the only component that talks to the execution service.
//! It never retries and never inspects session state; deciding whether a call
//! is legal right now is the controller's job.

use async_trait::async_trait;

use super::types::{StartRequest, StatusFrame};
use crate::error::TransportError;

/// Typed operations against one snippet's remote execution
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Launch a remote execution and return its initial status frame
    async fn start(
        &self,
        snippet_id: &str,
        request: &StartRequest,
    ) -> Result<StatusFrame, TransportError>;

    /// Read the current status and the lines produced since the last read
    ///
    /// Safe to repeat; callers append the returned lines.
    async fn poll_status(&self, snippet_id: &str) -> Result<StatusFrame, TransportError>;

    /// Deliver one line of program input
    async fn send_input(&self, snippet_id: &str, input: &str) -> Result<(), TransportError>;

    /// Stop the remote execution; a no-op when it already ended
    async fn cancel(&self, snippet_id: &str) -> Result<(), TransportError>;
}
