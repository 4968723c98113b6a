//! Wire protocol of the action-control channel.
//!
//! Input flows through [`LineFramer`] (bytes to units) and [`parse_unit`]
//! (units to [`ActionBatch`]es). Output is rendered by [`ReplyEncoder`].
//! Failures are [`ChannelError`]s, classified as fatal or recoverable.

mod detect;
mod encoder;
mod errors;
mod framer;
mod json;
mod legacy;
mod request;

pub use self::detect::{parse_text, parse_unit, syntax_error_shape};
pub use self::encoder::{ReplyEncoder, flat_reply, legacy_reply, run_result};
pub use self::errors::{ChannelError, ErrorKind};
pub use self::framer::{Frame, LineFramer, MAX_UNIT_BYTES, Unit};
pub use self::legacy::{LegacySyntaxError, parse_actions};
pub use self::request::{
    ActionBatch, ActionRequest, ActionResult, CorrelationId, Origin, ReplyShape,
};

pub(crate) const PROTOCOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::protocol");
