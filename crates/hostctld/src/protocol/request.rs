//! Normalised requests produced by the parser.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::session::Action;

static NEXT_CORRELATION: AtomicU64 = AtomicU64::new(1);

/// Token linking a request to its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Allocates a process-wide unique token.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CORRELATION.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Syntax the request arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Legacy `Name(args)` line.
    Legacy,
    /// JSON object or array.
    JsonObject,
    /// JSON string holding legacy syntax.
    JsonString,
}

/// Wire shape a reply is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// `data:` lines, status line, `ok`/`error`.
    Legacy,
    /// `{"result":[…],"success":…,"status":"…"}`.
    Flat,
    /// `{"run-result":{…}}`, with `ui-error` for failures.
    Run,
}

/// One unit of scheduling: a non-empty chain of actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    steps: Vec<Action>,
    origin: Origin,
    reply: ReplyShape,
    correlation: CorrelationId,
    r_tag: Option<String>,
}

impl ActionRequest {
    /// Builds a request, or `None` when `steps` is empty.
    #[must_use]
    pub fn new(steps: Vec<Action>, origin: Origin, reply: ReplyShape) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            steps,
            origin,
            reply,
            correlation: CorrelationId::next(),
            r_tag: None,
        })
    }

    /// Builds a request holding one action.
    #[must_use]
    pub fn single(action: Action, origin: Origin, reply: ReplyShape) -> Self {
        Self {
            steps: vec![action],
            origin,
            reply,
            correlation: CorrelationId::next(),
            r_tag: None,
        }
    }

    /// Attaches the caller's `r-tag`.
    #[must_use]
    pub fn with_tag(mut self, r_tag: Option<String>) -> Self {
        self.r_tag = r_tag;
        self
    }

    /// Name of the first action.
    #[must_use]
    pub fn name(&self) -> &str {
        self.steps.first().map_or("", Action::name)
    }

    /// Arguments of the first action.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.steps.first().map(Action::args).unwrap_or_default()
    }

    /// Every action in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Action] {
        &self.steps
    }

    /// Syntax the request arrived in.
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Shape of the eventual reply.
    #[must_use]
    pub const fn reply(&self) -> ReplyShape {
        self.reply
    }

    /// Correlation token.
    #[must_use]
    pub const fn correlation(&self) -> CorrelationId {
        self.correlation
    }

    /// Caller-supplied tag, echoed on `run-result` replies.
    #[must_use]
    pub fn r_tag(&self) -> Option<&str> {
        self.r_tag.as_deref()
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                formatter.write_str(" ")?;
            }
            write!(formatter, "{step}")?;
        }
        Ok(())
    }
}

/// Requests parsed from one input unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBatch {
    requests: Vec<ActionRequest>,
}

impl ActionBatch {
    pub(crate) const fn new(requests: Vec<ActionRequest>) -> Self {
        Self { requests }
    }

    /// Requests in input order.
    #[must_use]
    pub fn requests(&self) -> &[ActionRequest] {
        &self.requests
    }

    /// Number of requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the batch holds no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Folds every request into one chain replying in `reply`.
    ///
    /// Used by transports that return exactly one reply per exchange.
    #[must_use]
    pub fn into_chain(self, reply: ReplyShape) -> Option<ActionRequest> {
        let origin = self.requests.first()?.origin();
        let steps = self
            .requests
            .into_iter()
            .flat_map(|request| request.steps)
            .collect();
        ActionRequest::new(steps, origin, reply)
    }

    /// Consumes the batch.
    #[must_use]
    pub fn into_requests(self) -> Vec<ActionRequest> {
        self.requests
    }
}

/// Outcome of one request, produced exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Token of the originating request.
    pub correlation: CorrelationId,
    /// Whether every step succeeded.
    pub success: bool,
    /// Output of every executed step, in order.
    pub text: Vec<String>,
    /// Logical completion time, monotonic per channel.
    pub completed_at: u64,
    /// Wall-clock execution time.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chains_are_rejected() {
        assert!(ActionRequest::new(Vec::new(), Origin::Legacy, ReplyShape::Legacy).is_none());
    }

    #[test]
    fn accessors_report_first_step() {
        let request = ActionRequest::new(
            vec![
                Action::new("Wait", ["1", "seconds"]),
                Action::new("Set", ["startTls"]),
            ],
            Origin::Legacy,
            ReplyShape::Legacy,
        )
        .expect("non-empty chain");
        assert_eq!(request.name(), "Wait");
        assert_eq!(request.args(), ["1", "seconds"]);
        assert_eq!(request.to_string(), "Wait(1,seconds) Set(startTls)");
    }

    #[test]
    fn batches_fold_into_one_chain() {
        let batch = ActionBatch::new(vec![
            ActionRequest::single(Action::new("Set", ["a"]), Origin::JsonObject, ReplyShape::Flat),
            ActionRequest::single(Action::new("Echo", ["b"]), Origin::JsonObject, ReplyShape::Flat),
        ]);
        let chain = batch.into_chain(ReplyShape::Flat).expect("non-empty batch");
        assert_eq!(chain.to_string(), "Set(a) Echo(b)");
    }

    #[test]
    fn correlation_tokens_are_unique() {
        assert_ne!(CorrelationId::next(), CorrelationId::next());
    }
}
