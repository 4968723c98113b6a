//! The input side of a channel: framing, parsing and submission.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use tracing::{debug, warn};

use hostctl_config::Dialect;

use super::CHANNEL_TARGET;
use super::event::ChannelEvent;
use super::scheduler::{LogicalClock, Scheduler};
use super::state::{ChannelOutcome, ChannelState};
use crate::protocol::{
    ChannelError, Frame, LineFramer, MAX_UNIT_BYTES, parse_unit, syntax_error_shape,
};

const READ_CHUNK_BYTES: usize = 4096;

/// The writer is gone; nothing read from here on can be answered.
struct Disconnected;

pub(crate) struct InputReader {
    scheduler: Arc<Scheduler>,
    clock: Arc<LogicalClock>,
    dialect: Dialect,
    events: Sender<ChannelEvent>,
    closed: Arc<AtomicBool>,
    state: ChannelState,
    sequence: u64,
    fatal: Option<ChannelError>,
}

impl InputReader {
    pub(crate) fn new(
        scheduler: Arc<Scheduler>,
        dialect: Dialect,
        events: Sender<ChannelEvent>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            scheduler,
            clock: Arc::new(LogicalClock::new()),
            dialect,
            events,
            closed,
            state: ChannelState::Open,
            sequence: 0,
            fatal: None,
        }
    }

    /// Reads until end of input, a fatal error, or the writer closing.
    pub(crate) fn run<R: Read>(mut self, mut input: R) -> ChannelOutcome {
        let mut framer = LineFramer::new();
        let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
        while self.state.accepts_input() {
            let read = match read_chunk(&mut input, &mut chunk) {
                Ok(0) => {
                    self.state.on_end_of_input();
                    break;
                }
                Ok(read) => read,
                Err(error) => {
                    warn!(
                        target: CHANNEL_TARGET,
                        error = %error,
                        "failed to read channel input"
                    );
                    return ChannelOutcome::ReadFailed;
                }
            };
            if self.closed.load(Ordering::SeqCst) {
                self.state.on_quit();
                return ChannelOutcome::Quit;
            }
            for frame in framer.push(chunk.get(..read).unwrap_or_default()) {
                if !self.state.accepts_input() {
                    break;
                }
                if self.accept(frame).is_err() {
                    self.state.on_quit();
                    return ChannelOutcome::Quit;
                }
            }
        }
        if let Some(discarded) = framer.finish() {
            debug!(
                target: CHANNEL_TARGET,
                bytes = discarded,
                "discarding incomplete trailing input"
            );
        }
        self.fatal.map_or(ChannelOutcome::EndOfInput, ChannelOutcome::Fatal)
    }

    fn accept(&mut self, frame: Frame) -> Result<(), Disconnected> {
        let parsed = match frame {
            Frame::Unit(unit) => parse_unit(&unit, self.dialect),
            Frame::Oversized { size } => Err(ChannelError::syntax(
                format!("Input unit of {size} bytes exceeds the {MAX_UNIT_BYTES} byte limit"),
                syntax_error_shape(self.dialect),
            )),
        };
        let batch = self.sequence;
        self.sequence += 1;
        match parsed {
            Ok(requests) => {
                self.events
                    .send(ChannelEvent::Submitted {
                        batch,
                        requests: requests.len(),
                    })
                    .map_err(|_| Disconnected)?;
                self.scheduler
                    .submit(requests, batch, &self.clock, &self.events);
            }
            Err(error) => {
                debug!(
                    target: CHANNEL_TARGET,
                    batch,
                    fatal = error.is_fatal(),
                    error = %error,
                    "input rejected"
                );
                self.state.on_error(&error);
                if error.is_fatal() {
                    self.fatal = Some(error.clone());
                }
                self.events
                    .send(ChannelEvent::Rejected { batch, error })
                    .map_err(|_| Disconnected)?;
            }
        }
        Ok(())
    }
}

fn read_chunk<R: Read>(input: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match input.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
