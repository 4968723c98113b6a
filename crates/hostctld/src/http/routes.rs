//! REST route handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::routing::{get, post};
use tracing::debug;

use hostctl_config::Dialect;
use hostctl_wire::FlatReply;

use super::HTTP_TARGET;
use super::error::RequestError;
use crate::channel::{ChannelContext, Execution, LogicalClock};
use crate::protocol::{ActionRequest, ReplyShape, flat_reply, parse_text};

/// State shared by every REST handler.
#[derive(Clone)]
pub(crate) struct RestState {
    context: ChannelContext,
    clock: Arc<LogicalClock>,
}

impl RestState {
    fn status_line(&self, elapsed: Duration) -> String {
        self.context.encoder().status_line(elapsed)
    }

    fn parse(&self, text: &str) -> Result<ActionRequest, RequestError> {
        let batch = parse_text(text, Dialect::Flat).map_err(|error| RequestError::Rejected {
            message: error.message().to_owned(),
            status: self.status_line(Duration::ZERO),
        })?;
        batch
            .into_chain(ReplyShape::Flat)
            .ok_or_else(|| RequestError::Rejected {
                message: "No actions".to_owned(),
                status: self.status_line(Duration::ZERO),
            })
    }

    async fn run(&self, text: &str) -> Result<Execution, RequestError> {
        let request = self.parse(text)?;
        debug!(target: HTTP_TARGET, %request, "executing REST request");
        let scheduler = Arc::clone(self.context.scheduler());
        let clock = Arc::clone(&self.clock);
        tokio::task::spawn_blocking(move || scheduler.execute(&request, &clock))
            .await
            .map_err(|error| RequestError::Execution {
                message: error.to_string(),
                status: self.status_line(Duration::ZERO),
            })
    }

    fn flat(&self, execution: Execution) -> FlatReply {
        let result = execution.result;
        let status = self.status_line(result.elapsed);
        flat_reply(result.text, result.success, status)
    }
}

/// Builds the REST router rooted at `/{namespace}/rest`.
pub(crate) fn rest_router(namespace: &str, context: ChannelContext) -> Router {
    let state = RestState {
        context,
        clock: Arc::new(LogicalClock::new()),
    };
    let root = format!("/{}/rest", namespace.trim_matches('/'));
    Router::new()
        .route(&format!("{root}/json/{{*actions}}"), get(json_actions))
        .route(&format!("{root}/text/{{*actions}}"), get(text_actions))
        .route(&format!("{root}/stext/{{*actions}}"), get(status_text_actions))
        .route(&format!("{root}/post"), post(posted_actions))
        .fallback(unknown_route)
        .with_state(state)
}

async fn json_actions(
    State(state): State<RestState>,
    Path(actions): Path<String>,
) -> Result<Json<FlatReply>, RequestError> {
    let execution = state.run(&actions).await?;
    Ok(Json(state.flat(execution)))
}

async fn text_actions(
    State(state): State<RestState>,
    Path(actions): Path<String>,
) -> Result<String, RequestError> {
    let execution = state.run(&actions).await?;
    Ok(lines(execution.result.text))
}

async fn status_text_actions(
    State(state): State<RestState>,
    Path(actions): Path<String>,
) -> Result<String, RequestError> {
    let execution = state.run(&actions).await?;
    let mut text = vec![state.status_line(execution.result.elapsed)];
    text.extend(execution.result.text);
    Ok(lines(text))
}

async fn posted_actions(
    State(state): State<RestState>,
    body: String,
) -> Result<Json<FlatReply>, RequestError> {
    let execution = state.run(&body).await?;
    Ok(Json(state.flat(execution)))
}

async fn unknown_route(State(state): State<RestState>, uri: Uri) -> RequestError {
    debug!(target: HTTP_TARGET, %uri, "no REST route");
    RequestError::NotFound {
        path: uri.path().to_owned(),
        status: state.status_line(Duration::ZERO),
    }
}

fn lines(text: Vec<String>) -> String {
    text.into_iter().fold(String::new(), |mut body, line| {
        body.push_str(&line);
        body.push('\n');
        body
    })
}
