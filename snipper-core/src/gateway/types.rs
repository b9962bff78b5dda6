//! Wire types exchanged with the execution service

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Status reported by the remote runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    /// Execution accepted, process launched
    Started,
    /// Process running and producing output
    #[serde(alias = "RUNNING")]
    Output,
    /// Process blocked reading input
    Waiting,
    /// Process exited normally
    Completed,
    /// Process failed or could not run
    Error,
}

impl RemoteStatus {
    /// Whether the remote process has stopped for good
    pub fn is_terminal(self) -> bool {
        matches!(self, RemoteStatus::Completed | RemoteStatus::Error)
    }
}

/// One status read: the remote status plus the lines produced since the
/// previous read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFrame {
    pub status: RemoteStatus,
    #[serde(default, deserialize_with = "one_or_many")]
    pub message: Vec<String>,
}

impl StatusFrame {
    pub fn new<I, S>(status: RemoteStatus, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status,
            message: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Frame without any new output
    pub fn empty(status: RemoteStatus) -> Self {
        Self {
            status,
            message: Vec::new(),
        }
    }
}

/// Body of `POST /executions/{snippetId}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub environment: BTreeMap<String, String>,
    pub version: String,
}

impl StartRequest {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            environment: BTreeMap::new(),
            version: version.into(),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }
}

/// Body of `POST /executions/{snippetId}/input`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    pub input: String,
}

/// Body of `DELETE /executions/{snippetId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub user_id: String,
}

/// The runner sends `message` either as one string or as a list of lines.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(line)) => vec![line],
        Some(OneOrMany::Many(lines)) => lines,
        None => Vec::new(),
    })
}
