//! Messages flowing from the reader and workers to the writer.

use crate::protocol::{ActionRequest, ActionResult, ChannelError};

/// Event on a channel's result queue.
#[derive(Debug)]
pub(crate) enum ChannelEvent {
    /// A unit parsed into `requests` requests, all now running.
    Submitted { batch: u64, requests: usize },
    /// One request finished.
    Completed {
        batch: u64,
        request: ActionRequest,
        result: ActionResult,
        quit: bool,
    },
    /// A unit was rejected.
    Rejected { batch: u64, error: ChannelError },
}

/// Something the writer must render.
#[derive(Debug)]
pub(crate) enum Reply {
    Result {
        request: ActionRequest,
        result: ActionResult,
        quit: bool,
    },
    Error(ChannelError),
}
