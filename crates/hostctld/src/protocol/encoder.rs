//! Reply rendering.
//!
//! Every reply is rendered into one buffer so the writer can emit it with a
//! single write.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use hostctl_wire::{FlatReply, RunResult, RunResultBody, UiError, UiErrorBody};

use super::PROTOCOL_TARGET;
use super::errors::ChannelError;
use super::request::{ActionResult, ReplyShape};
use crate::session::StatusProvider;

const ENCODING_FAILED: &str = "{\"ui-error\":{\"fatal\":false,\"text\":\"reply encoding failed\"}}\n";

/// Renders results and errors, reading the session status at render time.
#[derive(Clone)]
pub struct ReplyEncoder {
    status: Arc<dyn StatusProvider>,
}

impl ReplyEncoder {
    /// Builds an encoder over a status provider.
    #[must_use]
    pub fn new(status: Arc<dyn StatusProvider>) -> Self {
        Self { status }
    }

    /// Current status line with the given execution time.
    #[must_use]
    pub fn status_line(&self, elapsed: Duration) -> String {
        self.status.status().line(elapsed)
    }

    /// Renders a result in `shape`, echoing `r_tag` on `run-result` replies.
    #[must_use]
    pub fn encode_result(
        &self,
        shape: ReplyShape,
        r_tag: Option<&str>,
        result: &ActionResult,
    ) -> String {
        match shape {
            ReplyShape::Legacy => legacy_reply(
                &result.text,
                result.success,
                &self.status_line(result.elapsed),
            ),
            ReplyShape::Flat => json_line(&flat_reply(
                result.text.clone(),
                result.success,
                self.status_line(result.elapsed),
            )),
            ReplyShape::Run => json_line(&run_result(result, r_tag)),
        }
    }

    /// Renders a channel error in the shape it carries.
    #[must_use]
    pub fn encode_error(&self, error: &ChannelError) -> String {
        let message = error.message().to_owned();
        match error.shape() {
            ReplyShape::Legacy => {
                legacy_reply(&[message], false, &self.status_line(Duration::ZERO))
            }
            ReplyShape::Flat => json_line(&flat_reply(
                vec![message],
                false,
                self.status_line(Duration::ZERO),
            )),
            ReplyShape::Run => json_line(&ui_error(error)),
        }
    }
}

/// `data:` lines, the status line, then `ok` or `error`.
///
/// A text item spanning several lines yields one `data:` line per line, so a
/// reader never sees a bare continuation line.
#[must_use]
pub fn legacy_reply(text: &[String], success: bool, status_line: &str) -> String {
    let mut reply = String::new();
    for line in text.iter().flat_map(|item| display_lines(item)) {
        reply.push_str("data: ");
        reply.push_str(line);
        reply.push('\n');
    }
    reply.push_str(status_line);
    reply.push('\n');
    reply.push_str(if success { "ok\n" } else { "error\n" });
    reply
}

/// Lines of one text item; `\r\n`, `\n` and a lone `\r` each end a line. A
/// single trailing break does not start another line.
fn display_lines(item: &str) -> impl Iterator<Item = &str> {
    let body = item
        .strip_suffix("\r\n")
        .or_else(|| item.strip_suffix(['\n', '\r']))
        .unwrap_or(item);
    body.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
}

/// Flat-protocol reply body.
#[must_use]
pub const fn flat_reply(result: Vec<String>, success: bool, status: String) -> FlatReply {
    FlatReply {
        result,
        success,
        status,
    }
}

/// `run-result` reply for `result`.
#[must_use]
pub fn run_result(result: &ActionResult, r_tag: Option<&str>) -> RunResult {
    let millis = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX);
    RunResult {
        run_result: RunResultBody {
            success: result.success,
            text: result.text.clone(),
            r_tag: r_tag.map(str::to_owned),
            time: Some(Duration::from_millis(millis).as_secs_f64()),
        },
    }
}

fn ui_error(error: &ChannelError) -> UiError {
    let (line, column) = error.location().unzip();
    UiError {
        ui_error: UiErrorBody {
            fatal: error.is_fatal(),
            text: error.message().to_owned(),
            line,
            column,
        },
    }
}

fn json_line<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(mut line) => {
            line.push('\n');
            line
        }
        Err(error) => {
            warn!(target: PROTOCOL_TARGET, error = %error, "failed to encode reply");
            ENCODING_FAILED.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::protocol::CorrelationId;
    use crate::session::{MockStatusProvider, SessionStatus};

    #[fixture]
    fn encoder() -> ReplyEncoder {
        let mut status = MockStatusProvider::new();
        status
            .expect_status()
            .returning(SessionStatus::disconnected);
        ReplyEncoder::new(Arc::new(status))
    }

    fn result(success: bool, text: &[&str]) -> ActionResult {
        ActionResult {
            correlation: CorrelationId::next(),
            success,
            text: text.iter().map(|line| (*line).to_owned()).collect(),
            completed_at: 1,
            elapsed: Duration::from_millis(250),
        }
    }

    #[rstest]
    fn legacy_result_has_data_status_and_verdict(encoder: ReplyEncoder) {
        let reply = encoder.encode_result(ReplyShape::Legacy, None, &result(true, &["true"]));
        assert_eq!(reply, "data: true\nL U U N N 4 24 80 0 0 0x0 0.250\nok\n");
    }

    #[rstest]
    #[case("a\nb", "data: a\ndata: b\n")]
    #[case("a\r\nb", "data: a\ndata: b\n")]
    #[case("a\rb\n", "data: a\ndata: b\n")]
    #[case("a\n\nb", "data: a\ndata: \ndata: b\n")]
    #[case("", "data: \n")]
    fn legacy_text_with_line_breaks_keeps_every_line_prefixed(
        #[case] item: &str,
        #[case] data: &str,
    ) {
        let reply = legacy_reply(&[item.to_owned()], true, "S");
        assert_eq!(reply, format!("{data}S\nok\n"));
    }

    #[rstest]
    fn legacy_error_with_line_breaks_stays_framed(encoder: ReplyEncoder) {
        let error = ChannelError::semantic("first\nsecond", ReplyShape::Legacy);
        let reply = encoder.encode_error(&error);
        let lines: Vec<_> = reply.lines().collect();
        assert_eq!(lines.get(..2), Some(&["data: first", "data: second"][..]));
        assert_eq!(lines.last().copied(), Some("error"));
        assert_eq!(lines.len(), 4);
    }

    #[rstest]
    fn flat_result_carries_status(encoder: ReplyEncoder) {
        let reply = encoder.encode_result(ReplyShape::Flat, None, &result(false, &["nope"]));
        let parsed: FlatReply = serde_json::from_str(&reply).expect("flat reply");
        assert_eq!(parsed.result, ["nope"]);
        assert!(!parsed.success);
        assert!(parsed.status.starts_with("L U U N N 4 24 80 0 0 0x0 "));
        assert!(reply.ends_with('\n') && reply.matches('\n').count() == 1);
    }

    #[rstest]
    fn run_result_round_trips(encoder: ReplyEncoder) {
        let original = result(true, &["a", "b"]);
        let reply = encoder.encode_result(ReplyShape::Run, Some("tag"), &original);
        let parsed: RunResult = serde_json::from_str(&reply).expect("run-result");
        assert_eq!(parsed, run_result(&original, Some("tag")));
        assert_eq!(parsed.run_result.text, original.text);
        assert_eq!(parsed.run_result.success, original.success);
        assert_eq!(parsed.run_result.r_tag.as_deref(), Some("tag"));
    }

    #[rstest]
    fn legacy_syntax_error_splits_into_four_parts(encoder: ReplyEncoder) {
        let error = ChannelError::syntax(
            "JSON parse error: line 1, column 8: expected value",
            ReplyShape::Legacy,
        )
        .at(1, 8);
        let reply = encoder.encode_error(&error);
        let parts: Vec<_> = reply.split('\n').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(
            parts.first().copied(),
            Some("data: JSON parse error: line 1, column 8: expected value")
        );
        assert_eq!(parts.get(2).copied(), Some("error"));
    }

    #[rstest]
    #[case(ChannelError::semantic("Missing struct element 'actions'", ReplyShape::Run), false)]
    #[case(ChannelError::syntax("JSON parse error", ReplyShape::Run).at(2, 3), true)]
    fn run_errors_render_as_ui_error(
        encoder: ReplyEncoder,
        #[case] error: ChannelError,
        #[case] fatal: bool,
    ) {
        let reply = encoder.encode_error(&error);
        let parsed: UiError = serde_json::from_str(&reply).expect("ui-error");
        assert_eq!(parsed.ui_error.fatal, fatal);
        assert_eq!(parsed.ui_error.text, error.message());
        assert_eq!(
            parsed.ui_error.line.zip(parsed.ui_error.column),
            error.location()
        );
    }

    #[rstest]
    fn flat_semantic_error_has_message_as_only_line(encoder: ReplyEncoder) {
        let reply = encoder.encode_error(&ChannelError::semantic("Not a struct", ReplyShape::Flat));
        let parsed: FlatReply = serde_json::from_str(&reply).expect("flat reply");
        assert_eq!(parsed.result, ["Not a struct"]);
        assert!(!parsed.success);
    }
}
