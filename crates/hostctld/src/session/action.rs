//! Opaque action values and their outcomes.

use std::fmt;

/// One named command with ordered string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    name: String,
    args: Vec<String>,
}

impl Action {
    /// Builds an action from a name and its arguments.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Action name as written by the controller.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Renders the action in legacy syntax, quoting arguments that need it.
impl fmt::Display for Action {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}(", self.name)?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                formatter.write_str(",")?;
            }
            write_arg(formatter, arg)?;
        }
        formatter.write_str(")")
    }
}

fn write_arg(formatter: &mut fmt::Formatter<'_>, arg: &str) -> fmt::Result {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, ',' | '(' | ')' | '"' | '\\'));
    if !needs_quotes {
        return formatter.write_str(arg);
    }
    formatter.write_str("\"")?;
    for ch in arg.chars() {
        if matches!(ch, '"' | '\\') {
            formatter.write_str("\\")?;
        }
        write!(formatter, "{ch}")?;
    }
    formatter.write_str("\"")
}

/// What the executor reports after running one action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionOutcome {
    /// Whether the action succeeded.
    pub success: bool,
    /// Output lines.
    pub text: Vec<String>,
    /// The action asked for the channel to close.
    pub quit: bool,
}

impl ActionOutcome {
    /// A successful outcome with the given output.
    #[must_use]
    pub fn succeeded<I, S>(text: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            success: true,
            text: text.into_iter().map(Into::into).collect(),
            quit: false,
        }
    }

    /// A successful outcome without output.
    #[must_use]
    pub fn ok() -> Self {
        Self::succeeded(Vec::<String>::new())
    }

    /// A failed outcome carrying one diagnostic line.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            text: vec![message.into()],
            quit: false,
        }
    }

    /// Marks the outcome as a request to close the channel.
    #[must_use]
    pub const fn with_quit(mut self) -> Self {
        self.quit = true;
        self
    }
}
