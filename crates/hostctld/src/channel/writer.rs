//! The single writer of a channel's output.

use std::io::{self, Write};
use std::sync::mpsc::Receiver;

use tracing::warn;

use super::CHANNEL_TARGET;
use super::event::{ChannelEvent, Reply};
use super::sequencer::ReplySequencer;
use crate::protocol::ReplyEncoder;

/// Why the writer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriterExit {
    /// Every sender hung up and every reply was written.
    Drained,
    /// A quit reply was written and nothing was outstanding.
    Quit,
    /// The output rejected a write.
    Failed,
}

/// Writes each reply with one `write_all` followed by a flush.
pub(crate) struct ReplyWriter<W> {
    writer: W,
}

impl<W: Write> ReplyWriter<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(crate) fn write_reply(&mut self, reply: &str) -> io::Result<()> {
        self.writer.write_all(reply.as_bytes())?;
        self.writer.flush()
    }
}

/// Drains `events`, writing replies in the order `sequencer` releases them.
pub(crate) fn pump_replies<W: Write>(
    events: &Receiver<ChannelEvent>,
    mut sequencer: ReplySequencer,
    encoder: &ReplyEncoder,
    writer: &mut ReplyWriter<W>,
) -> WriterExit {
    let mut outstanding = 0_usize;
    let mut quit = false;
    for event in events {
        match &event {
            ChannelEvent::Submitted { requests, .. } => outstanding += requests,
            ChannelEvent::Completed { .. } => outstanding = outstanding.saturating_sub(1),
            ChannelEvent::Rejected { .. } => {}
        }
        for reply in sequencer.accept(event) {
            let rendered = match reply {
                Reply::Result {
                    request,
                    result,
                    quit: requested,
                } => {
                    quit |= requested;
                    encoder.encode_result(request.reply(), request.r_tag(), &result)
                }
                Reply::Error(error) => encoder.encode_error(&error),
            };
            if let Err(error) = writer.write_reply(&rendered) {
                warn!(
                    target: CHANNEL_TARGET,
                    error = %error,
                    "failed to write reply"
                );
                return WriterExit::Failed;
            }
        }
        if quit && outstanding == 0 && sequencer.is_idle() {
            return WriterExit::Quit;
        }
    }
    WriterExit::Drained
}
