//! Session seam between the action-control channel and the emulator.
//!
//! The channel never interprets actions. It hands each [`Action`] to an
//! [`ActionExecutor`] and reads the session snapshot through a
//! [`StatusProvider`] whenever it renders a reply. Both traits are
//! implemented by [`PlaceholderSession`] so the daemon is runnable on its own.

mod action;
mod placeholder;
mod status;

use std::sync::Arc;

pub use self::action::{Action, ActionOutcome};
pub use self::placeholder::PlaceholderSession;
pub use self::status::{ConnectionState, EmulatorMode, KeyboardState, SessionStatus};

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Executes one action against the live session.
///
/// Implementations own mutual exclusion on session state: the scheduler calls
/// `execute` from many threads at once. A call may block for as long as the
/// action needs. Failure is reported through [`ActionOutcome::success`], never
/// by panicking.
#[cfg_attr(test, mockall::automock)]
pub trait ActionExecutor: Send + Sync {
    /// Runs `action` to completion.
    fn execute(&self, action: &Action) -> ActionOutcome;
}

/// Supplies the session snapshot appended to replies.
#[cfg_attr(test, mockall::automock)]
pub trait StatusProvider: Send + Sync {
    /// Returns the current session status.
    fn status(&self) -> SessionStatus;
}

impl<T> ActionExecutor for Arc<T>
where
    T: ActionExecutor + ?Sized,
{
    fn execute(&self, action: &Action) -> ActionOutcome {
        (**self).execute(action)
    }
}

impl<T> StatusProvider for Arc<T>
where
    T: StatusProvider + ?Sized,
{
    fn status(&self) -> SessionStatus {
        (**self).status()
    }
}
