use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "snipper", about = "Run stored snippets on a remote runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Runner API root, overriding config and SNIPPER_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a snippet interactively
    Run(commands::run::RunArgs),
    /// Read the status of an execution once
    Status(commands::status::StatusArgs),
    /// Cancel an execution
    Cancel(commands::cancel::CancelArgs),
    /// Print the formatted source of a snippet
    Format(commands::rules::RulesArgs),
    /// Lint a snippet
    Lint(commands::rules::RulesArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Program output owns stdout
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ConfigLoader::load()?;
    if let Some(base_url) = cli.base_url {
        config.server.base_url = base_url;
    }

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &config).await?,
        Commands::Status(args) => commands::status::run(args, &config).await?,
        Commands::Cancel(args) => commands::cancel::run(args, &config).await?,
        Commands::Format(args) => commands::rules::format(args, &config).await?,
        Commands::Lint(args) => return commands::rules::lint(args, &config).await,
        Commands::Config(args) => commands::config::run(args, &config)?,
    }
    Ok(ExitCode::SUCCESS)
}
