//! Concurrent execution of requests.
//!
//! Every request of a batch runs on its own thread; its steps run in order
//! against the shared executor. Completions are sent to the channel's event
//! queue, so the writer sees them in completion order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::CHANNEL_TARGET;
use super::event::ChannelEvent;
use crate::protocol::{ActionBatch, ActionRequest, ActionResult};
use crate::session::ActionExecutor;

/// Monotonic per-channel completion counter.
#[derive(Debug, Default)]
pub struct LogicalClock(AtomicU64);

impl LogicalClock {
    /// Creates a clock at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Advances the clock and returns the new time.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }
}

/// Result of running one request, plus whether it asked to quit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Result to report.
    pub result: ActionResult,
    /// An executed action asked for the channel to close.
    pub quit: bool,
}

/// Runs requests against the session executor.
pub struct Scheduler {
    executor: Arc<dyn ActionExecutor>,
}

impl Scheduler {
    /// Builds a scheduler over `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        Self { executor }
    }

    /// Runs every step of `request` on the calling thread.
    ///
    /// Steps run in order and stop at the first failure or quit; the text of
    /// every executed step is concatenated.
    #[must_use]
    pub fn execute(&self, request: &ActionRequest, clock: &LogicalClock) -> Execution {
        let started = Instant::now();
        let mut text = Vec::new();
        let mut success = true;
        let mut quit = false;
        for step in request.steps() {
            let outcome = self.executor.execute(step);
            text.extend(outcome.text);
            if outcome.quit {
                quit = true;
                success = outcome.success;
                break;
            }
            if !outcome.success {
                success = false;
                break;
            }
        }
        let elapsed = started.elapsed();
        Execution {
            result: ActionResult {
                correlation: request.correlation(),
                success,
                text,
                completed_at: clock.tick(),
                elapsed,
            },
            quit,
        }
    }

    /// Launches every request of `batch` and reports completions to `events`.
    pub(crate) fn submit(
        self: &Arc<Self>,
        batch: ActionBatch,
        sequence: u64,
        clock: &Arc<LogicalClock>,
        events: &Sender<ChannelEvent>,
    ) {
        for request in batch.into_requests() {
            debug!(
                target: CHANNEL_TARGET,
                correlation = request.correlation().get(),
                batch = sequence,
                %request,
                "request submitted"
            );
            let job = Job {
                scheduler: Arc::clone(self),
                clock: Arc::clone(clock),
                events: events.clone(),
                sequence,
            };
            let spawned = thread::Builder::new()
                .name("hostctl-action".to_owned())
                .spawn({
                    let spawned_request = request.clone();
                    let spawned_job = job.clone();
                    move || spawned_job.run(spawned_request)
                });
            if let Err(error) = spawned {
                warn!(
                    target: CHANNEL_TARGET,
                    error = %error,
                    "failed to spawn action thread; running inline"
                );
                job.run(request);
            }
        }
    }
}

#[derive(Clone)]
struct Job {
    scheduler: Arc<Scheduler>,
    clock: Arc<LogicalClock>,
    events: Sender<ChannelEvent>,
    sequence: u64,
}

impl Job {
    fn run(self, request: ActionRequest) {
        let Execution { result, quit } = self.scheduler.execute(&request, &self.clock);
        debug!(
            target: CHANNEL_TARGET,
            correlation = result.correlation.get(),
            success = result.success,
            elapsed_ms = millis(result.elapsed),
            "request completed"
        );
        let event = ChannelEvent::Completed {
            batch: self.sequence,
            request,
            result,
            quit,
        };
        if self.events.send(event).is_err() {
            debug!(
                target: CHANNEL_TARGET,
                "channel closed before result could be delivered"
            );
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
