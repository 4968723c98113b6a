//! One bidirectional action-control channel.
//!
//! A channel reads units from its input on a dedicated thread, parses each
//! into a batch and hands every request to the [`Scheduler`], which runs it on
//! a worker thread. Workers report completions through a single queue; the
//! calling thread drains that queue through a sequencer and is the only
//! writer of the channel's output.
//!
//! The channel ends when its input ends and every submitted request has
//! replied, after a fatal error has been reported and outstanding results
//! drained, or once an action asks to quit.

mod event;
mod reader;
mod scheduler;
mod sequencer;
mod state;
mod writer;

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, warn};

use hostctl_config::{Dialect, ReplyOrder};

pub use scheduler::{Execution, LogicalClock, Scheduler};
pub use state::{ChannelOutcome, ChannelState};

use self::reader::InputReader;
use self::sequencer::ReplySequencer;
use self::writer::{ReplyWriter, WriterExit, pump_replies};
use crate::health::HealthReporter;
use crate::protocol::ReplyEncoder;
use crate::session::{ActionExecutor, StatusProvider};

pub(crate) const CHANNEL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::channel");

/// Everything channels share across transports and connections.
#[derive(Clone)]
pub struct ChannelContext {
    scheduler: Arc<Scheduler>,
    encoder: ReplyEncoder,
    reporter: Arc<dyn HealthReporter>,
}

impl ChannelContext {
    /// Builds a context executing against `executor`.
    #[must_use]
    pub fn new(
        executor: Arc<dyn ActionExecutor>,
        status: Arc<dyn StatusProvider>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new(executor)),
            encoder: ReplyEncoder::new(status),
            reporter,
        }
    }

    /// Shared scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Shared reply encoder.
    #[must_use]
    pub const fn encoder(&self) -> &ReplyEncoder {
        &self.encoder
    }

    /// Lifecycle reporter.
    #[must_use]
    pub fn reporter(&self) -> &dyn HealthReporter {
        self.reporter.as_ref()
    }
}

/// Per-channel protocol settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Reply convention for JSON input.
    pub dialect: Dialect,
    /// Order in which replies are written.
    pub order: ReplyOrder,
}

impl ChannelSettings {
    /// Builds settings from a dialect and reply order.
    #[must_use]
    pub const fn new(dialect: Dialect, order: ReplyOrder) -> Self {
        Self { dialect, order }
    }
}

/// Serves one channel until it ends.
///
/// `close` runs once the writer has finished. Transports use it to unblock a
/// reader still waiting for input, for example by shutting a socket down.
pub fn run_channel<R, W, F>(
    context: &ChannelContext,
    settings: ChannelSettings,
    peer: &str,
    input: R,
    output: W,
    close: F,
) -> ChannelOutcome
where
    R: Read + Send + 'static,
    W: Write,
    F: FnOnce(),
{
    context.reporter.channel_opened(peer);
    let (events, received) = mpsc::channel();
    let closed = Arc::new(AtomicBool::new(false));
    let reader = InputReader::new(
        Arc::clone(&context.scheduler),
        settings.dialect,
        events,
        Arc::clone(&closed),
    );
    let spawned = thread::Builder::new()
        .name("hostctl-reader".to_owned())
        .spawn(move || reader.run(input));
    let reader_thread = match spawned {
        Ok(handle) => handle,
        Err(error) => {
            warn!(
                target: CHANNEL_TARGET,
                peer,
                error = %error,
                "failed to spawn channel reader"
            );
            close();
            let outcome = ChannelOutcome::ReadFailed;
            context.reporter.channel_closed(peer, &outcome);
            return outcome;
        }
    };

    let mut writer = ReplyWriter::new(output);
    let exit = pump_replies(
        &received,
        ReplySequencer::new(settings.order),
        &context.encoder,
        &mut writer,
    );
    closed.store(true, Ordering::SeqCst);
    close();

    let outcome = match exit {
        WriterExit::Quit => ChannelOutcome::Quit,
        WriterExit::Failed => ChannelOutcome::WriteFailed,
        WriterExit::Drained => reader_thread
            .join()
            .unwrap_or(ChannelOutcome::ReadFailed),
    };
    if let ChannelOutcome::Fatal(error) = &outcome {
        context.reporter.channel_failed(peer, error);
    }
    debug!(target: CHANNEL_TARGET, peer, %outcome, "channel finished");
    context.reporter.channel_closed(peer, &outcome);
    outcome
}
