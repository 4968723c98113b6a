//! The standard I/O channel.

use std::io;
use std::thread;

use crate::channel::{ChannelContext, ChannelOutcome, ChannelSettings, run_channel};

/// Serves one channel over stdin and stdout on a background thread.
///
/// `on_exit` runs on that thread after the channel ends. A reader blocked on
/// stdin after a quit is left behind; the process is expected to exit.
pub(crate) fn spawn_stdio_channel<F>(
    context: ChannelContext,
    settings: ChannelSettings,
    on_exit: F,
) -> io::Result<thread::JoinHandle<ChannelOutcome>>
where
    F: FnOnce(&ChannelOutcome) + Send + 'static,
{
    thread::Builder::new()
        .name("hostctl-stdio".to_owned())
        .spawn(move || {
            let outcome = run_channel(
                &context,
                settings,
                "stdio",
                io::stdin(),
                io::stdout().lock(),
                || {},
            );
            on_exit(&outcome);
            outcome
        })
}
