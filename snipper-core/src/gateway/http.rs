//! HTTP implementation of the execution gateway

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use super::traits::ExecutionGateway;
use super::types::{CancelRequest, InputRequest, RemoteStatus, StartRequest, StatusFrame};
use crate::error::TransportError;
use crate::transport::{HttpTransport, encode_segment};

/// Gateway speaking the runner's REST surface
#[derive(Debug, Clone)]
pub struct HttpExecutionGateway {
    transport: HttpTransport,
    user_id: String,
}

impl HttpExecutionGateway {
    /// `user_id` identifies the caller on cancel requests.
    pub fn new(transport: HttpTransport, user_id: impl Into<String>) -> Self {
        Self {
            transport,
            user_id: user_id.into(),
        }
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }
}

fn execution_path(snippet_id: &str) -> String {
    format!("/executions/{}", encode_segment(snippet_id))
}

#[async_trait]
impl ExecutionGateway for HttpExecutionGateway {
    async fn start(
        &self,
        snippet_id: &str,
        request: &StartRequest,
    ) -> Result<StatusFrame, TransportError> {
        let frame: Option<StatusFrame> = self
            .transport
            .send_json(Method::POST, &execution_path(snippet_id), request)
            .await?;
        Ok(frame.unwrap_or_else(|| StatusFrame::empty(RemoteStatus::Started)))
    }

    async fn poll_status(&self, snippet_id: &str) -> Result<StatusFrame, TransportError> {
        let path = format!("{}/status", execution_path(snippet_id));
        let frame: Option<StatusFrame> = self.transport.get_json(&path).await?;
        // An empty body carries no news: still running, nothing new.
        Ok(frame.unwrap_or_else(|| StatusFrame::empty(RemoteStatus::Output)))
    }

    async fn send_input(&self, snippet_id: &str, input: &str) -> Result<(), TransportError> {
        let path = format!("{}/input", execution_path(snippet_id));
        let body = InputRequest {
            input: input.to_string(),
        };
        self.transport.send_text(Method::POST, &path, &body).await?;
        Ok(())
    }

    async fn cancel(&self, snippet_id: &str) -> Result<(), TransportError> {
        let body = CancelRequest {
            user_id: self.user_id.clone(),
        };
        self.transport
            .send_text(Method::DELETE, &execution_path(snippet_id), &body)
            .await?;
        debug!(snippet_id = %snippet_id, "Cancel acknowledged");
        Ok(())
    }
}
