//! Incremental splitting of a byte stream into input units.
//!
//! A unit whose first non-blank byte is `{`, `[` or `"` is JSON and may span
//! several physical lines; it ends at the first newline where it is
//! structurally balanced. Anything else is a single line. Unbalanced JSON is
//! test-parsed at each newline so that a genuine syntax error completes the unit
//! instead of swallowing the rest of the stream.

use serde::de::IgnoredAny;

/// Largest unit the framer will buffer.
pub const MAX_UNIT_BYTES: usize = 1024 * 1024;

/// One complete input unit, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    text: String,
}

impl Unit {
    /// Unit text. Invalid UTF-8 is replaced.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Output of [`LineFramer::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete unit.
    Unit(Unit),
    /// The pending unit grew past [`MAX_UNIT_BYTES`]. The framer yields
    /// nothing further.
    Oversized {
        /// Bytes buffered when the limit was hit.
        size: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitMode {
    Line,
    Json,
}

enum Parse {
    Complete,
    Incomplete,
    Malformed,
}

/// Per-connection framer state.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    start: usize,
    cursor: usize,
    mode: Option<UnitMode>,
    depth: usize,
    in_string: bool,
    escaped: bool,
    unbalanced: bool,
    exhausted: bool,
}

impl LineFramer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes and returns every unit they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        if self.exhausted {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(unit) = self.next_unit() {
            frames.push(Frame::Unit(unit));
        }
        let pending = self.buffer.len().saturating_sub(self.start);
        if pending > MAX_UNIT_BYTES {
            self.exhausted = true;
            self.buffer.clear();
            frames.push(Frame::Oversized { size: pending });
        }
        frames
    }

    /// Ends the stream, returning the size of any partial unit discarded.
    #[must_use]
    pub fn finish(self) -> Option<usize> {
        let pending = self.buffer.len().saturating_sub(self.start);
        (self.mode.is_some() && pending > 0).then_some(pending)
    }

    fn next_unit(&mut self) -> Option<Unit> {
        while let Some(&byte) = self.buffer.get(self.cursor) {
            self.cursor += 1;
            match self.mode {
                None if byte.is_ascii_whitespace() => self.start = self.cursor,
                None if matches!(byte, b'{' | b'[' | b'"') => {
                    self.mode = Some(UnitMode::Json);
                    self.scan_json(byte);
                }
                None => self.mode = Some(UnitMode::Line),
                Some(UnitMode::Line) if byte == b'\n' => return Some(self.take_unit()),
                Some(UnitMode::Json) if byte == b'\n' && self.json_complete() => {
                    return Some(self.take_unit());
                }
                Some(UnitMode::Json) => self.scan_json(byte),
                Some(UnitMode::Line) => {}
            }
        }
        None
    }

    fn scan_json(&mut self, byte: u8) {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return;
        }
        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => match self.depth.checked_sub(1) {
                Some(depth) => self.depth = depth,
                None => self.unbalanced = true,
            },
            _ => {}
        }
    }

    fn json_complete(&self) -> bool {
        if self.depth == 0 || self.in_string || self.unbalanced {
            return true;
        }
        let pending = self
            .buffer
            .get(self.start..self.cursor)
            .unwrap_or_default();
        !matches!(trial_parse(pending), Parse::Incomplete)
    }

    fn take_unit(&mut self) -> Unit {
        let start = self.start;
        let drained: Vec<u8> = self.buffer.drain(..self.cursor).skip(start).collect();
        self.start = 0;
        self.cursor = 0;
        self.mode = None;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.unbalanced = false;

        let text = String::from_utf8_lossy(&drained);
        Unit {
            text: text.trim_end_matches(['\n', '\r']).to_owned(),
        }
    }
}

fn trial_parse(bytes: &[u8]) -> Parse {
    let values = serde_json::Deserializer::from_slice(bytes).into_iter::<IgnoredAny>();
    for value in values {
        match value {
            Ok(_) => {}
            Err(error) if error.is_eof() => return Parse::Incomplete,
            Err(_) => return Parse::Malformed,
        }
    }
    Parse::Complete
}
