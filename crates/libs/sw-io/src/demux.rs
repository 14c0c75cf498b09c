//! Output line demultiplexer.
//!
//! Chunks read from a pipe do not line up with line boundaries. A
//! [`LineSplitter`] keeps the unterminated tail of each stream until its
//! terminator arrives, so the lines produced are the same however the bytes
//! were chunked.

use strip_ansi_escapes::strip;
use sw_models::output::{LineClass, OutputLine, OutputStream};

const SUCCESS_MARKERS: [&str; 5] = ["[+]", "success", "completed", "completad", "found"];
const WARN_MARKERS: [&str; 3] = ["[!]", "warn", "advertenc"];
const ERROR_MARKERS: [&str; 5] = ["[✗]", "[x]", "error", "failed", "falló"];
const PHASE_MARKERS: [&str; 3] = ["═══", "fase ", "phase "];
const INFO_MARKERS: [&str; 4] = ["[*]", "info", "ejecutand", "running"];

/// Per-stream line buffer.
#[derive(Debug)]
pub struct LineSplitter {
    stream: OutputStream,
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new(stream: OutputStream) -> Self {
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    /// Feed a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<OutputLine> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            if let Some(line) = self.make_line(&self.pending[start..end]) {
                lines.push(line);
            }
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Flush the unterminated fragment left when the stream closes.
    pub fn finish(&mut self) -> Option<OutputLine> {
        let rest = std::mem::take(&mut self.pending);
        self.make_line(&rest)
    }

    fn make_line(&self, raw: &[u8]) -> Option<OutputLine> {
        let text = clean_line(raw);
        if text.trim().is_empty() {
            return None;
        }
        let class = classify(&text);
        Some(OutputLine::new(text, self.stream, class))
    }
}

/// Decode a raw line, dropping a trailing carriage return and ANSI escapes.
pub fn clean_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(&strip(raw)).into_owned()
}

/// Best-effort display category for a line.
///
/// Categories are tested in priority order; anything unmatched gets
/// [`LineClass::Default`].
pub fn classify(line: &str) -> LineClass {
    let lower = line.to_lowercase();
    let matches = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if matches(&SUCCESS_MARKERS) {
        LineClass::Success
    } else if matches(&WARN_MARKERS) {
        LineClass::Warn
    } else if matches(&ERROR_MARKERS) {
        LineClass::Error
    } else if matches(&PHASE_MARKERS) {
        LineClass::Phase
    } else if matches(&INFO_MARKERS) {
        LineClass::Info
    } else {
        LineClass::Default
    }
}
