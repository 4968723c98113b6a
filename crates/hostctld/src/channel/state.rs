//! Channel lifecycle.

use std::fmt;

use crate::protocol::ChannelError;

/// Input-side state of a channel.
///
/// `Open` accepts input. A fatal error moves it to `Closing`, where no more
/// input is read but outstanding results are still written. End of input or
/// a quit request closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Reading and executing input.
    Open,
    /// Draining after a fatal error.
    Closing,
    /// Finished.
    Closed,
}

impl ChannelState {
    /// Applies a parse failure.
    pub const fn on_error(&mut self, error: &ChannelError) {
        if error.is_fatal() && matches!(self, Self::Open) {
            *self = Self::Closing;
        }
    }

    /// Applies the end of the input stream.
    pub const fn on_end_of_input(&mut self) {
        *self = Self::Closed;
    }

    /// Applies a quit request from an executed action.
    pub const fn on_quit(&mut self) {
        *self = Self::Closed;
    }

    /// Whether more input should be read.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// How a channel ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// Input ended and every result was written.
    EndOfInput,
    /// A fatal error stopped input; outstanding results were written.
    Fatal(ChannelError),
    /// An action asked the channel to close.
    Quit,
    /// Reading input failed.
    ReadFailed,
    /// Writing a reply failed.
    WriteFailed,
}

impl fmt::Display for ChannelOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfInput => formatter.write_str("end of input"),
            Self::Fatal(error) => write!(formatter, "fatal error: {error}"),
            Self::Quit => formatter.write_str("quit requested"),
            Self::ReadFailed => formatter.write_str("read failed"),
            Self::WriteFailed => formatter.write_str("write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::protocol::ReplyShape;

    #[rstest]
    #[case(ChannelError::semantic("Not a struct", ReplyShape::Flat), ChannelState::Open)]
    #[case(ChannelError::syntax("JSON parse error", ReplyShape::Legacy), ChannelState::Closing)]
    fn errors_are_classified(#[case] error: ChannelError, #[case] expected: ChannelState) {
        let mut state = ChannelState::Open;
        state.on_error(&error);
        assert_eq!(state, expected);
    }

    #[test]
    fn closing_channels_close_at_end_of_input() {
        let mut state = ChannelState::Closing;
        assert!(!state.accepts_input());
        state.on_end_of_input();
        assert_eq!(state, ChannelState::Closed);
    }

    #[test]
    fn quit_closes_an_open_channel() {
        let mut state = ChannelState::Open;
        state.on_quit();
        assert_eq!(state, ChannelState::Closed);
    }
}
