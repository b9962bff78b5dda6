use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::client;
use crate::config::SnipperConfig;

#[derive(Args)]
pub struct RulesArgs {
    /// Snippet to check
    pub snippet_id: String,

    /// Language version (defaults to execution.default_version)
    #[arg(long)]
    pub version: Option<String>,
}

impl RulesArgs {
    fn version<'a>(&'a self, config: &'a SnipperConfig) -> &'a str {
        self.version
            .as_deref()
            .unwrap_or(&config.execution.default_version)
    }
}

/// Print the server-formatted source
pub async fn format(args: RulesArgs, config: &SnipperConfig) -> Result<()> {
    let rules = client::build_rules_client(config)?;
    let formatted = rules
        .format(&args.snippet_id, args.version(config))
        .await
        .with_context(|| format!("Failed to format {}", args.snippet_id))?;
    print!("{}", formatted);
    Ok(())
}

/// Print lint findings; failure exit code when there are any
pub async fn lint(args: RulesArgs, config: &SnipperConfig) -> Result<ExitCode> {
    let rules = client::build_rules_client(config)?;
    let report = rules
        .lint(&args.snippet_id, args.version(config))
        .await
        .with_context(|| format!("Failed to lint {}", args.snippet_id))?;

    if report.is_clean() {
        println!("No issues found.");
        return Ok(ExitCode::SUCCESS);
    }
    for issue in &report.errors {
        println!("{}", issue);
    }
    Ok(ExitCode::FAILURE)
}
