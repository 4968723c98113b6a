//! Per-unit format detection.

use hostctl_config::Dialect;

use super::errors::ChannelError;
use super::framer::Unit;
use super::json;
use super::legacy::parse_actions;
use super::request::{ActionBatch, ActionRequest, Origin, ReplyShape};

/// Parses one framed unit into a batch of requests.
///
/// The first non-blank character decides the syntax: `{` or `[` is a JSON
/// object or array, `"` is one or more JSON strings, anything else is legacy
/// syntax. `dialect` picks the reply shape of JSON strings and of fatal
/// syntax errors.
///
/// # Errors
///
/// Returns a fatal [`ChannelError`] for malformed JSON and a recoverable one
/// for input that parsed but does not describe valid actions.
pub fn parse_unit(unit: &Unit, dialect: Dialect) -> Result<ActionBatch, ChannelError> {
    parse_text(unit.text(), dialect)
}

/// Parses text that arrived already delimited, such as an HTTP body.
///
/// # Errors
///
/// As for [`parse_unit`].
pub fn parse_text(text: &str, dialect: Dialect) -> Result<ActionBatch, ChannelError> {
    let syntax_shape = syntax_error_shape(dialect);
    match text.trim_start().chars().next() {
        Some('{' | '[') => json::parse_structured(text, syntax_shape),
        Some('"') => json::parse_strings(text, syntax_shape, string_reply_shape(dialect)),
        _ => parse_legacy(text),
    }
}

/// Shape of a fatal syntax error on a channel speaking `dialect`.
#[must_use]
pub const fn syntax_error_shape(dialect: Dialect) -> ReplyShape {
    match dialect {
        Dialect::Flat => ReplyShape::Legacy,
        Dialect::Run => ReplyShape::Run,
    }
}

const fn string_reply_shape(dialect: Dialect) -> ReplyShape {
    match dialect {
        Dialect::Flat => ReplyShape::Flat,
        Dialect::Run => ReplyShape::Run,
    }
}

fn parse_legacy(text: &str) -> Result<ActionBatch, ChannelError> {
    let steps = parse_actions(text)
        .map_err(|error| ChannelError::semantic(error.to_string(), ReplyShape::Legacy))?;
    let requests = ActionRequest::new(steps, Origin::Legacy, ReplyShape::Legacy)
        .into_iter()
        .collect();
    Ok(ActionBatch::new(requests))
}
