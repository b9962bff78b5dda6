//! SessionManager for tracking one execution per snippet
//!
//! The manager hands out controllers keyed by snippet id. A snippet can only
//! have one live execution: starting again while one is still running is
//! rejected, and a finished one is replaced.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::gateway::{ExecutionGateway, StartRequest};

use super::controller::{ControllerConfig, SessionController};
use super::state::SessionState;

/// Registry of execution sessions sharing one gateway
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<SessionController>>>,
    gateway: Arc<dyn ExecutionGateway>,
    config: ControllerConfig,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn ExecutionGateway>, config: ControllerConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            gateway,
            config,
        }
    }

    /// Start an execution of `snippet_id`
    ///
    /// Fails with `AlreadyActive` when the snippet has a session that has not
    /// terminated. The controller is registered before the start request is
    /// sent, so it can be cancelled while starting; it stays registered even
    /// if the start fails.
    pub async fn start(
        &self,
        snippet_id: &str,
        environment: BTreeMap<String, String>,
        version: &str,
    ) -> Result<Arc<SessionController>, SessionError> {
        let controller = {
            let mut sessions = self.sessions.write().await;
            if let Some(existing) = sessions.get(snippet_id) {
                if !existing.state().await.is_terminal() {
                    return Err(SessionError::AlreadyActive(snippet_id.to_string()));
                }
                debug!(snippet_id = %snippet_id, "Replacing terminated session");
                existing.dispose();
            }
            let controller = Arc::new(SessionController::new(
                snippet_id,
                self.gateway.clone(),
                self.config.clone(),
            ));
            sessions.insert(snippet_id.to_string(), controller.clone());
            controller
        };

        let request = StartRequest::new(version).with_environment(environment);
        controller.start(&request).await?;
        info!(
            snippet_id = %snippet_id,
            execution_id = %controller.execution_id(),
            "Session registered"
        );
        Ok(controller)
    }

    /// Get the controller for a snippet
    pub async fn get(&self, snippet_id: &str) -> Result<Arc<SessionController>, SessionError> {
        self.sessions
            .read()
            .await
            .get(snippet_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(snippet_id.to_string()))
    }

    /// Cancel the execution of a snippet
    pub async fn cancel(&self, snippet_id: &str) -> Result<(), SessionError> {
        self.get(snippet_id).await?.cancel().await
    }

    /// Forget a snippet's session, stopping its poll task
    ///
    /// The remote side is not contacted.
    pub async fn remove(&self, snippet_id: &str) -> Result<(), SessionError> {
        let controller = self
            .sessions
            .write()
            .await
            .remove(snippet_id)
            .ok_or_else(|| SessionError::NotFound(snippet_id.to_string()))?;
        controller.dispose();
        debug!(snippet_id = %snippet_id, "Session removed");
        Ok(())
    }

    /// Number of sessions that have not terminated
    pub async fn active_count(&self) -> usize {
        let controllers: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut count = 0;
        for controller in controllers {
            if !controller.state().await.is_terminal() {
                count += 1;
            }
        }
        count
    }

    /// All tracked sessions with their state, ordered by snippet id
    pub async fn list(&self) -> Vec<(String, SessionState)> {
        let controllers: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut listed = Vec::with_capacity(controllers.len());
        for controller in controllers {
            listed.push((controller.snippet_id().to_string(), controller.state().await));
        }
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        listed
    }
}
