//! Legacy action syntax.
//!
//! Two forms are accepted. The macro form is a sequence of
//! `Name(arg,arg)` calls separated by whitespace; parentheses may be omitted
//! for actions without arguments after the first. The command form is a
//! single `Name arg arg` line, used when the first name is not followed by
//! `(`. Arguments are separated by commas or whitespace and may be
//! double-quoted, in which case `\"` and `\\` are unescaped.

use thiserror::Error;

use crate::session::Action;

/// Why a legacy line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegacySyntaxError {
    /// Nothing but whitespace.
    #[error("Syntax error: empty action")]
    Empty,
    /// An action name was expected.
    #[error("Syntax error: expected action name at column {column}")]
    ExpectedName {
        /// One-based column of the offending character.
        column: usize,
    },
    /// The argument list was not closed.
    #[error("Syntax error: missing ')' after {name} arguments")]
    UnclosedArguments {
        /// Action whose argument list is open.
        name: String,
    },
    /// A quoted argument was not closed.
    #[error("Syntax error: unterminated quoted string at column {column}")]
    UnterminatedQuote {
        /// One-based column of the opening quote.
        column: usize,
    },
}

/// Parses one legacy line into a chain of actions.
///
/// # Errors
///
/// Returns a [`LegacySyntaxError`] describing the first problem found.
pub fn parse_actions(line: &str) -> Result<Vec<Action>, LegacySyntaxError> {
    let mut scanner = Scanner::new(line);
    scanner.skip_whitespace();
    if scanner.at_end() {
        return Err(LegacySyntaxError::Empty);
    }

    let name = scanner.name()?;
    scanner.skip_whitespace();
    if !scanner.eat('(') {
        let args = scanner.command_args()?;
        return Ok(vec![Action::new(name, args)]);
    }

    let args = scanner.paren_args(&name)?;
    let mut actions = vec![Action::new(name, args)];
    loop {
        scanner.skip_whitespace();
        if scanner.at_end() {
            return Ok(actions);
        }
        let next = scanner.name()?;
        scanner.skip_whitespace();
        let next_args = if scanner.eat('(') {
            scanner.paren_args(&next)?
        } else {
            Vec::new()
        };
        actions.push(Action::new(next, next_args));
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    const fn column(&self) -> usize {
        self.pos + 1
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn name(&mut self) -> Result<String, LegacySyntaxError> {
        if !self.peek().is_some_and(|ch| ch.is_ascii_alphabetic()) {
            return Err(LegacySyntaxError::ExpectedName {
                column: self.column(),
            });
        }
        let mut name = String::new();
        while let Some(ch) = self
            .peek()
            .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        {
            name.push(ch);
            self.pos += 1;
        }
        Ok(name)
    }

    fn paren_args(&mut self, name: &str) -> Result<Vec<String>, LegacySyntaxError> {
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(LegacySyntaxError::UnclosedArguments {
                        name: name.to_owned(),
                    });
                }
                Some(')') => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(',') => {
                    self.pos += 1;
                    args.push(String::new());
                }
                Some(_) => {
                    args.push(self.argument(&[',', ')'])?);
                    self.skip_whitespace();
                    self.eat(',');
                }
            }
        }
    }

    fn command_args(&mut self) -> Result<Vec<String>, LegacySyntaxError> {
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Ok(args);
            }
            args.push(self.argument(&[])?);
        }
    }

    fn argument(&mut self, terminators: &[char]) -> Result<String, LegacySyntaxError> {
        if self.peek() == Some('"') {
            return self.quoted();
        }
        let mut arg = String::new();
        while let Some(ch) = self
            .peek()
            .filter(|ch| !ch.is_whitespace() && !terminators.contains(ch))
        {
            arg.push(ch);
            self.pos += 1;
        }
        Ok(arg)
    }

    fn quoted(&mut self) -> Result<String, LegacySyntaxError> {
        let column = self.column();
        self.pos += 1;
        let mut arg = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(LegacySyntaxError::UnterminatedQuote { column });
            };
            self.pos += 1;
            match ch {
                '"' => return Ok(arg),
                '\\' => match self.peek() {
                    Some(escaped @ ('"' | '\\')) => {
                        arg.push(escaped);
                        self.pos += 1;
                    }
                    _ => arg.push('\\'),
                },
                other => arg.push(other),
            }
        }
    }
}
