//! JSON wire types for the hostctl action-control channel.
//!
//! Requests and replies are exchanged one JSON value per line. This crate
//! holds the shapes that controllers and the daemon both need to agree on:
//!
//! - the `run` request, `{"run":{"actions":[{"action":…,"args":[…]}]}}`;
//! - the `run-result` reply, `{"run-result":{"success":…,"text":[…]}}`;
//! - the flat reply, `{"result":[…],"success":…,"status":"…"}`;
//! - the `ui-error` reply, `{"ui-error":{"fatal":…,"text":"…"}}`.
//!
//! The legacy text protocol (`data:` lines, a status line and `ok`/`error`)
//! is not JSON and lives with the daemon's encoder.

use serde::{Deserialize, Serialize};

/// One action in a `run` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Action name, matched case-insensitively by the executor.
    pub action: String,
    /// Positional arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ActionSpec {
    /// Builds an action with arguments.
    #[must_use]
    pub fn new<I, S>(action: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action: action.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Body of a `run` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunBody {
    /// Actions to execute; each one is scheduled independently.
    pub actions: Vec<ActionSpec>,
    /// Caller-chosen tag echoed on every resulting `run-result`.
    #[serde(rename = "r-tag", default, skip_serializing_if = "Option::is_none")]
    pub r_tag: Option<String>,
}

/// A `run` request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Request body.
    pub run: RunBody,
}

impl RunRequest {
    /// Builds an untagged request for the given actions.
    #[must_use]
    pub const fn new(actions: Vec<ActionSpec>) -> Self {
        Self {
            run: RunBody {
                actions,
                r_tag: None,
            },
        }
    }

    /// Attaches a correlation tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.run.r_tag = Some(tag.into());
        self
    }
}

/// Outcome of one action in the `run` protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResultBody {
    /// Whether the action succeeded.
    pub success: bool,
    /// Output lines produced by the action.
    pub text: Vec<String>,
    /// Tag copied from the originating request.
    #[serde(rename = "r-tag", default, skip_serializing_if = "Option::is_none")]
    pub r_tag: Option<String>,
    /// Execution time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// A `run-result` reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Reply body.
    #[serde(rename = "run-result")]
    pub run_result: RunResultBody,
}

impl RunResult {
    /// Builds a reply without tag or timing.
    #[must_use]
    pub const fn new(success: bool, text: Vec<String>) -> Self {
        Self {
            run_result: RunResultBody {
                success,
                text,
                r_tag: None,
                time: None,
            },
        }
    }
}

/// Reply used by the flat single-command protocol and the REST surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatReply {
    /// Output lines produced by the action.
    pub result: Vec<String>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Session status line at the time the reply was rendered.
    pub status: String,
}

/// Body of a `ui-error` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiErrorBody {
    /// Whether the channel stopped accepting input.
    pub fatal: bool,
    /// Human-readable description.
    pub text: String,
    /// Input line of a syntax error, counting from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Input column of a syntax error, counting from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

/// A `ui-error` reply envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiError {
    /// Reply body.
    #[serde(rename = "ui-error")]
    pub ui_error: UiErrorBody,
}
