//! Session status snapshot and its status-line rendering.

use std::fmt;
use std::time::Duration;

/// Keyboard lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardState {
    /// Input is accepted.
    Unlocked,
    /// Input is inhibited, usually while waiting for the host.
    Locked,
    /// Locked by an operator error.
    Error,
}

impl KeyboardState {
    const fn token(self) -> char {
        match self {
            Self::Unlocked => 'U',
            Self::Locked => 'L',
            Self::Error => 'E',
        }
    }
}

/// Host connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No host session.
    NotConnected,
    /// Connected to the named host.
    Connected {
        /// Host name as given to the connect action.
        host: String,
    },
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => formatter.write_str("N"),
            Self::Connected { host } => write!(formatter, "C({host})"),
        }
    }
}

/// Emulator mode negotiated with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorMode {
    /// 3270 mode.
    Block,
    /// NVT line mode.
    NvtLine,
    /// NVT character mode.
    NvtCharacter,
    /// Connected but not yet negotiated.
    Pending,
    /// Not connected.
    None,
}

impl EmulatorMode {
    const fn token(self) -> char {
        match self {
            Self::Block => 'I',
            Self::NvtLine => 'L',
            Self::NvtCharacter => 'C',
            Self::Pending => 'P',
            Self::None => 'N',
        }
    }
}

/// Snapshot of the session appended to legacy and flat replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Keyboard lock state.
    pub keyboard: KeyboardState,
    /// Whether the screen is formatted into fields.
    pub formatted: bool,
    /// Whether the field under the cursor is protected.
    pub protected: bool,
    /// Host connection.
    pub connection: ConnectionState,
    /// Emulator mode.
    pub mode: EmulatorMode,
    /// Terminal model number.
    pub model: u8,
    /// Screen rows.
    pub rows: u16,
    /// Screen columns.
    pub columns: u16,
    /// Cursor row, counting from zero.
    pub cursor_row: u16,
    /// Cursor column, counting from zero.
    pub cursor_column: u16,
    /// Identifier of the emulator window, zero when headless.
    pub window_id: u64,
}

impl SessionStatus {
    /// Status of a model 4 session that is not connected to any host.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            keyboard: KeyboardState::Locked,
            formatted: false,
            protected: false,
            connection: ConnectionState::NotConnected,
            mode: EmulatorMode::None,
            model: 4,
            rows: 24,
            columns: 80,
            cursor_row: 0,
            cursor_column: 0,
            window_id: 0,
        }
    }

    /// The snapshot fields in status-line order, without the timing field.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        vec![
            self.keyboard.token().to_string(),
            flag(self.formatted, 'F').to_string(),
            flag(self.protected, 'P').to_string(),
            self.connection.to_string(),
            self.mode.token().to_string(),
            self.model.to_string(),
            self.rows.to_string(),
            self.columns.to_string(),
            self.cursor_row.to_string(),
            self.cursor_column.to_string(),
            format!("0x{:x}", self.window_id),
        ]
    }

    /// Renders the status line, ending with the execution time in seconds.
    #[must_use]
    pub fn line(&self, elapsed: Duration) -> String {
        let mut fields = self.fields();
        fields.push(format!(
            "{}.{:03}",
            elapsed.as_secs(),
            elapsed.subsec_millis()
        ));
        fields.join(" ")
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

const fn flag(set: bool, token: char) -> char {
    if set { token } else { 'U' }
}
