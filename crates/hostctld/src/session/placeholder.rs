//! In-memory session used when no emulator is attached.
//!
//! The catalogue covers each reply path of the channel: output lines,
//! failures, slow actions and quit.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::status::{ConnectionState, EmulatorMode, KeyboardState, SessionStatus};
use super::{Action, ActionExecutor, ActionOutcome, SESSION_TARGET, StatusProvider};

const TOGGLE_DEFAULTS: &[(&str, bool)] = &[
    ("blankFill", false),
    ("insertMode", false),
    ("lineWrap", true),
    ("monoCase", false),
    ("startTls", true),
    ("trace", false),
];

struct SessionState {
    status: SessionStatus,
    toggles: BTreeMap<String, bool>,
}

/// Executor and status provider backed by an in-memory session.
///
/// Supported actions, matched case-insensitively:
///
/// - `Set(toggle)` reports a toggle; `Set(toggle,value)` changes it.
/// - `Wait()`, `Wait(n)`, `Wait(n,seconds|milliseconds)` sleep; `n` may be
///   fractional.
/// - `Connect(host)` and `Disconnect()` change the connection state.
/// - `Query()` lists session facts; `Query(keyword)` reports one.
/// - `Echo(args…)` returns each argument as a line.
/// - `Fail(message)` fails with the message.
/// - `Quit()` asks the channel to close.
pub struct PlaceholderSession {
    state: Mutex<SessionState>,
}

impl PlaceholderSession {
    /// Builds a disconnected session with default toggles.
    #[must_use]
    pub fn new() -> Self {
        let toggles = TOGGLE_DEFAULTS
            .iter()
            .map(|(name, value)| ((*name).to_owned(), *value))
            .collect();
        Self {
            state: Mutex::new(SessionState {
                status: SessionStatus::disconnected(),
                toggles,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, args: &[String]) -> ActionOutcome {
        let Some(name) = args.first() else {
            return ActionOutcome::failed("Set: missing toggle name");
        };
        let mut state = self.lock();
        let Some(key) = state
            .toggles
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
        else {
            return ActionOutcome::failed(format!("Set: unknown toggle '{name}'"));
        };
        match args.get(1) {
            None => {
                let value = state.toggles.get(&key).copied().unwrap_or_default();
                ActionOutcome::succeeded([value.to_string()])
            }
            Some(raw) => match parse_bool(raw) {
                Some(value) => {
                    state.toggles.insert(key, value);
                    ActionOutcome::ok()
                }
                None => ActionOutcome::failed(format!("Set: invalid value '{raw}' for {key}")),
            },
        }
    }

    fn connect(&self, args: &[String]) -> ActionOutcome {
        let Some(host) = args.first().filter(|host| !host.is_empty()) else {
            return ActionOutcome::failed("Connect: missing host name");
        };
        let mut state = self.lock();
        if let ConnectionState::Connected { host: current } = &state.status.connection {
            return ActionOutcome::failed(format!("Connect: already connected to {current}"));
        }
        state.status.connection = ConnectionState::Connected { host: host.clone() };
        state.status.keyboard = KeyboardState::Unlocked;
        state.status.mode = EmulatorMode::Block;
        state.status.formatted = true;
        ActionOutcome::ok()
    }

    fn disconnect(&self) -> ActionOutcome {
        let mut state = self.lock();
        let window_id = state.status.window_id;
        state.status = SessionStatus {
            window_id,
            ..SessionStatus::disconnected()
        };
        ActionOutcome::ok()
    }

    fn query(&self, args: &[String]) -> ActionOutcome {
        let facts = self.facts();
        match args.first() {
            None => ActionOutcome::succeeded(
                facts
                    .iter()
                    .map(|(keyword, value)| format!("{keyword}: {value}")),
            ),
            Some(wanted) => facts
                .iter()
                .find(|(keyword, _)| keyword.eq_ignore_ascii_case(wanted))
                .map_or_else(
                    || ActionOutcome::failed(format!("Query: unknown keyword '{wanted}'")),
                    |(_, value)| ActionOutcome::succeeded([value.clone()]),
                ),
        }
    }

    fn facts(&self) -> Vec<(&'static str, String)> {
        let status = self.lock().status.clone();
        let host = match &status.connection {
            ConnectionState::Connected { host } => host.clone(),
            ConnectionState::NotConnected => String::new(),
        };
        vec![
            ("ConnectionState", connection_label(&status).to_owned()),
            ("Cursor", format!("{} {}", status.cursor_row, status.cursor_column)),
            ("Host", host),
            ("Model", format!("3279-{}", status.model)),
            ("ScreenCurSize", format!("{} {}", status.rows, status.columns)),
        ]
    }
}

impl Default for PlaceholderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor for PlaceholderSession {
    fn execute(&self, action: &Action) -> ActionOutcome {
        debug!(target: SESSION_TARGET, %action, "executing placeholder action");
        let args = action.args();
        match action.name().to_ascii_lowercase().as_str() {
            "set" => self.set(args),
            "wait" => wait(args),
            "connect" | "open" => self.connect(args),
            "disconnect" => self.disconnect(),
            "query" => self.query(args),
            "echo" => ActionOutcome::succeeded(args.iter().cloned()),
            "fail" => ActionOutcome::failed(
                args.first()
                    .cloned()
                    .unwrap_or_else(|| "Fail: action failed".to_owned()),
            ),
            "quit" | "exit" => ActionOutcome::ok().with_quit(),
            _ => ActionOutcome::failed(format!("Unknown action: {}", action.name())),
        }
    }
}

impl StatusProvider for PlaceholderSession {
    fn status(&self) -> SessionStatus {
        self.lock().status.clone()
    }
}

fn wait(args: &[String]) -> ActionOutcome {
    let Some(amount) = args.first() else {
        return ActionOutcome::ok();
    };
    // Negative and non-finite amounts are refused by the conversion.
    let Some(timeout) = amount
        .parse::<f64>()
        .ok()
        .and_then(|count| Duration::try_from_secs_f64(count).ok())
    else {
        return ActionOutcome::failed(format!("Wait: invalid timeout '{amount}'"));
    };
    let delay = match args.get(1).map(|unit| unit.to_ascii_lowercase()).as_deref() {
        None | Some("seconds" | "second" | "s") => timeout,
        Some("milliseconds" | "millisecond" | "ms") => timeout / 1000,
        Some(other) => return ActionOutcome::failed(format!("Wait: unknown unit '{other}'")),
    };
    thread::sleep(delay);
    ActionOutcome::ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "set" | "1" => Some(true),
        "false" | "off" | "clear" | "0" => Some(false),
        _ => None,
    }
}

const fn connection_label(status: &SessionStatus) -> &'static str {
    match (&status.connection, status.mode) {
        (ConnectionState::NotConnected, _) => "not-connected",
        (ConnectionState::Connected { .. }, EmulatorMode::Block) => "connected-3270",
        (ConnectionState::Connected { .. }, EmulatorMode::NvtLine | EmulatorMode::NvtCharacter) => {
            "connected-nvt"
        }
        (ConnectionState::Connected { .. }, EmulatorMode::Pending | EmulatorMode::None) => {
            "connecting"
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn session() -> PlaceholderSession {
        PlaceholderSession::new()
    }

    fn run(session: &PlaceholderSession, name: &str, args: &[&str]) -> ActionOutcome {
        session.execute(&Action::new(name, args.iter().copied()))
    }

    #[rstest]
    #[case("startTls", "true")]
    #[case("insertMode", "false")]
    #[case("STARTTLS", "true")]
    fn set_reports_toggle_values(
        session: PlaceholderSession,
        #[case] toggle: &str,
        #[case] expected: &str,
    ) {
        let outcome = run(&session, "Set", &[toggle]);
        assert_eq!(outcome, ActionOutcome::succeeded([expected]));
    }

    #[rstest]
    fn set_changes_toggle(session: PlaceholderSession) {
        assert!(run(&session, "Set", &["insertMode", "on"]).success);
        assert_eq!(run(&session, "Set", &["insertMode"]).text, vec!["true"]);
    }

    #[rstest]
    fn unknown_toggle_fails(session: PlaceholderSession) {
        let outcome = run(&session, "Set", &["noSuchToggle"]);
        assert!(!outcome.success);
    }

    #[rstest]
    fn connect_updates_status(session: PlaceholderSession) {
        assert!(run(&session, "Connect", &["mainframe"]).success);
        let line = session.status().line(Duration::ZERO);
        assert_eq!(line, "U F U C(mainframe) I 4 24 80 0 0 0x0 0.000");
        assert!(run(&session, "Disconnect", &[]).success);
        assert_eq!(session.status(), SessionStatus::disconnected());
    }

    #[rstest]
    fn wait_sleeps_for_requested_time(session: PlaceholderSession) {
        let start = Instant::now();
        assert!(run(&session, "Wait", &["30", "milliseconds"]).success);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[rstest]
    fn wait_accepts_fractional_seconds(session: PlaceholderSession) {
        let start = Instant::now();
        assert!(run(&session, "Wait", &["0.05", "seconds"]).success);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[rstest]
    #[case(&["soon"])]
    #[case(&["1", "fortnights"])]
    #[case(&["-1"])]
    #[case(&["inf"])]
    #[case(&["NaN", "seconds"])]
    fn wait_rejects_bad_arguments(session: PlaceholderSession, #[case] args: &[&str]) {
        assert!(!run(&session, "Wait", args).success);
    }

    #[rstest]
    fn query_reports_single_keyword(session: PlaceholderSession) {
        let outcome = run(&session, "Query", &["screencursize"]);
        assert_eq!(outcome, ActionOutcome::succeeded(["24 80"]));
    }

    #[rstest]
    fn quit_requests_close(session: PlaceholderSession) {
        let outcome = run(&session, "Quit", &[]);
        assert!(outcome.success && outcome.quit);
    }

    #[rstest]
    fn unknown_action_fails_with_name(session: PlaceholderSession) {
        let outcome = run(&session, "Frobnicate", &[]);
        assert_eq!(outcome, ActionOutcome::failed("Unknown action: Frobnicate"));
    }
}
