use anyhow::{Context, Result};
use clap::Args;
use snipper_core::{ExecutionGateway, RemoteStatus};

use crate::client;
use crate::config::SnipperConfig;

#[derive(Args)]
pub struct StatusArgs {
    /// Snippet whose execution to inspect
    pub snippet_id: String,
}

/// Poll once and print the frame
pub async fn run(args: StatusArgs, config: &SnipperConfig) -> Result<()> {
    let gateway = client::build_gateway(config)?;
    let frame = gateway
        .poll_status(&args.snippet_id)
        .await
        .with_context(|| format!("Failed to read status of {}", args.snippet_id))?;

    println!("{}", status_line(frame.status));
    for line in &frame.message {
        println!("  {}", line);
    }
    Ok(())
}

fn status_line(status: RemoteStatus) -> String {
    if status.is_terminal() {
        format!("Status: {:?} (finished)", status)
    } else {
        format!("Status: {:?}", status)
    }
}
