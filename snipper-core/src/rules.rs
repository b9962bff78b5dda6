//! Formatting and linting of stored snippets
//!
//! Both operations run on the server against the snippet's saved source and
//! share the execution gateway's transport and error handling.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{HttpTransport, encode_segment};

/// One problem reported by the linter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintIssue {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl std::fmt::Display for LintIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Line {}, Column {}: {}",
            self.line, self.column, self.message
        )
    }
}

/// Result of linting a snippet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    #[serde(default)]
    pub errors: Vec<LintIssue>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Serialize)]
struct VersionRequest<'a> {
    version: &'a str,
}

/// Client for the format and lint endpoints
#[derive(Debug, Clone)]
pub struct RulesClient {
    transport: HttpTransport,
}

impl RulesClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Formatted source of the snippet
    pub async fn format(&self, snippet_id: &str, version: &str) -> Result<String, TransportError> {
        let path = format!("/snippets/{}/format", encode_segment(snippet_id));
        let formatted = self
            .transport
            .send_text(Method::POST, &path, &VersionRequest { version })
            .await?;
        debug!(snippet_id = %snippet_id, bytes = formatted.len(), "Snippet formatted");
        Ok(formatted)
    }

    /// Lint findings for the snippet; an empty reply means no findings
    pub async fn lint(&self, snippet_id: &str, version: &str) -> Result<LintReport, TransportError> {
        let path = format!("/snippets/{}/lint", encode_segment(snippet_id));
        let report: Option<LintReport> = self
            .transport
            .send_json(Method::POST, &path, &VersionRequest { version })
            .await?;
        let report = report.unwrap_or_default();
        debug!(snippet_id = %snippet_id, issues = report.errors.len(), "Snippet linted");
        Ok(report)
    }
}
