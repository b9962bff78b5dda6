use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use snipper_core::{
    ExecutionGateway, MockGateway, SessionController, SessionEvent, SessionState, StartRequest,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client;
use crate::config::SnipperConfig;

/// Delay before a refused input line is sent again
const INPUT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Args)]
pub struct RunArgs {
    /// Snippet to execute
    pub snippet_id: String,

    /// Language version (defaults to execution.default_version)
    #[arg(long)]
    pub version: Option<String>,

    /// Extra environment variable, repeatable
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Play a scripted session instead of contacting the runner
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: RunArgs, config: &SnipperConfig) -> Result<()> {
    let version = args
        .version
        .unwrap_or_else(|| config.execution.default_version.clone());
    let mut environment: BTreeMap<String, String> = config.execution.environment.clone();
    environment.extend(args.env);

    let gateway: Arc<dyn ExecutionGateway> = if args.dry_run {
        info!("Dry run, using scripted gateway");
        Arc::new(MockGateway::demo())
    } else {
        Arc::new(client::build_gateway(config)?)
    };
    let controller = SessionController::new(
        args.snippet_id.as_str(),
        gateway,
        client::controller_config(config),
    );
    let events = controller.subscribe();

    controller
        .start(&StartRequest::new(version).with_environment(environment))
        .await
        .with_context(|| format!("Failed to start snippet {}", args.snippet_id))?;

    let outcome = drive(
        &controller,
        events,
        BufReader::new(tokio::io::stdin()),
        &mut std::io::stdout(),
        async {
            let _ = tokio::signal::ctrl_c().await;
            eprintln!("Cancelling...");
        },
    )
    .await;

    let view = controller.view().await;
    controller.dispose();
    if let Some(banner) = view.banner {
        eprintln!("{}", banner);
    }
    outcome?;
    match controller.state().await {
        SessionState::Failed { message } => bail!("Execution failed: {}", message),
        _ => Ok(()),
    }
}

/// Relay a started session between `input`, `out` and the controller until
/// it terminates.
///
/// Lines read ahead of a prompt are queued and sent one per prompt. A line
/// the runner refuses is retried after `INPUT_RETRY_DELAY`. When `input` is
/// exhausted while the program waits for more, the session is cancelled.
/// `interrupt` resolving cancels the session too.
async fn drive<R, W>(
    controller: &SessionController,
    mut events: broadcast::Receiver<SessionEvent>,
    input: R,
    out: &mut W,
    interrupt: impl Future<Output = ()>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut input_lines = input.lines();
    let mut input_open = true;
    let mut typed: VecDeque<String> = VecDeque::new();
    let mut retry_at: Option<Instant> = None;
    let mut interrupted = false;
    let mut input_exhausted = false;
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    debug!(snippet_id = %event.snippet_id(), "Session event");
                    match event {
                        SessionEvent::Output { lines, .. } => {
                            for line in lines {
                                writeln!(out, "{}", line)?;
                            }
                        }
                        SessionEvent::StateChanged { state, .. } => {
                            if state.is_terminal() {
                                break;
                            }
                            if state == SessionState::WaitingForInput && retry_at.is_none() {
                                retry_at = submit_next(controller, &mut typed).await;
                            }
                        }
                        SessionEvent::PollFailed { error, .. } => {
                            warn!(error = %error, "Status poll failed");
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Output display fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            line = input_lines.next_line(), if input_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        typed.push_back(line);
                        if retry_at.is_none()
                            && controller.state().await == SessionState::WaitingForInput
                        {
                            retry_at = submit_next(controller, &mut typed).await;
                        }
                    }
                    None => input_open = false,
                }
            },
            _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                retry_at = None;
                if controller.state().await == SessionState::WaitingForInput {
                    retry_at = submit_next(controller, &mut typed).await;
                }
            },
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                cancel(controller).await;
            }
        }

        if !input_open
            && !input_exhausted
            && typed.is_empty()
            && controller.state().await == SessionState::WaitingForInput
        {
            input_exhausted = true;
            warn!("Input closed while the program is waiting, cancelling");
            cancel(controller).await;
        }
    }

    out.flush()?;
    if input_exhausted {
        bail!("Input ended while the program was still waiting for input");
    }
    Ok(())
}

/// Send the oldest typed line. A refused line is put back and the time to
/// retry it is returned.
async fn submit_next(
    controller: &SessionController,
    typed: &mut VecDeque<String>,
) -> Option<Instant> {
    let line = typed.pop_front()?;
    match controller.submit_input(&line).await {
        Ok(()) => None,
        Err(err) => {
            warn!(error = %err, "Input not delivered, retrying");
            typed.push_front(line);
            Some(Instant::now() + INPUT_RETRY_DELAY)
        }
    }
}

async fn cancel(controller: &SessionController) {
    if let Err(err) = controller.cancel().await {
        warn!(error = %err, "Runner did not acknowledge cancel");
    }
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
