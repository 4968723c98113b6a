//! Channel behaviour knobs: reply dialect and reply ordering.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// JSON reply convention spoken on stream transports.
///
/// The dialect only matters where the request itself does not pin the reply
/// shape: JSON-string requests and fatal syntax errors.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Dialect {
    /// Script-port convention: flat `{"result","success","status"}` replies,
    /// syntax errors reported as legacy text.
    #[default]
    Flat,
    /// UI convention: every line is JSON, results are `run-result` objects and
    /// errors are `ui-error` objects.
    Run,
}

/// Order in which a stream channel writes replies.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReplyOrder {
    /// Write each result as soon as it completes.
    Completion,
    /// Release whole batches in the order their input arrived; results inside
    /// a batch still follow completion order.
    Arrival,
}

/// Errors encountered while parsing a [`Dialect`] from text.
pub type DialectParseError = strum::ParseError;

/// Errors encountered while parsing a [`ReplyOrder`] from text.
pub type ReplyOrderParseError = strum::ParseError;

pub(crate) const fn default_stdio_reply_order() -> ReplyOrder {
    ReplyOrder::Arrival
}

pub(crate) const fn default_socket_reply_order() -> ReplyOrder {
    ReplyOrder::Completion
}
