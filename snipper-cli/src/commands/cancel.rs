use anyhow::{Context, Result};
use clap::Args;
use snipper_core::ExecutionGateway;

use crate::client;
use crate::config::SnipperConfig;

#[derive(Args)]
pub struct CancelArgs {
    /// Snippet whose execution to cancel
    pub snippet_id: String,
}

pub async fn run(args: CancelArgs, config: &SnipperConfig) -> Result<()> {
    let gateway = client::build_gateway(config)?;
    gateway
        .cancel(&args.snippet_id)
        .await
        .with_context(|| format!("Failed to cancel {}", args.snippet_id))?;
    println!("Cancelled {}", args.snippet_id);
    Ok(())
}
