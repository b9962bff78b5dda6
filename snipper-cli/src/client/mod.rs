//! Runner clients built from the effective configuration

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use snipper_core::{
    BearerToken, ControllerConfig, HttpExecutionGateway, HttpTransport, RulesClient,
    StaticCredentials,
};

use crate::config::SnipperConfig;

/// Transport for the configured server, carrying the configured token
pub fn build_transport(config: &SnipperConfig) -> Result<HttpTransport> {
    let credentials = Arc::new(match &config.auth.token {
        Some(token) => StaticCredentials::new(BearerToken::new(token.as_str())),
        None => StaticCredentials::anonymous(),
    });
    match config.server.request_timeout_secs {
        Some(secs) => HttpTransport::with_timeout(
            &config.server.base_url,
            credentials,
            Duration::from_secs(secs),
        )
        .context("Failed to build HTTP client"),
        None => Ok(HttpTransport::new(&config.server.base_url, credentials)),
    }
}

pub fn build_gateway(config: &SnipperConfig) -> Result<HttpExecutionGateway> {
    Ok(HttpExecutionGateway::new(
        build_transport(config)?,
        config.auth.user_id.clone(),
    ))
}

pub fn build_rules_client(config: &SnipperConfig) -> Result<RulesClient> {
    Ok(RulesClient::new(build_transport(config)?))
}

pub fn controller_config(config: &SnipperConfig) -> ControllerConfig {
    ControllerConfig {
        poll_interval: Duration::from_millis(config.execution.poll_interval_ms),
    }
}
