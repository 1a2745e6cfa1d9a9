//! Line reassembly for chunked text streams.
//!
//! Transports deliver text in chunks whose boundaries have nothing to do with
//! IRC line boundaries. [`FrameReader`] buffers the unterminated tail of each
//! chunk and only ever yields lines whose terminator has been seen.

use tracing::warn;

use crate::error::ProtocolError;

/// Upper bound on a buffered line, tags included (IRCv3 allows 8191 bytes).
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Splits a stream of text chunks into complete lines.
#[derive(Debug, Clone)]
pub struct FrameReader {
    incomplete: Option<String>,
    max_len: usize,
    /// Set after an overlong tail was dropped; everything up to the next
    /// newline belongs to that line and is dropped too.
    discarding: bool,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Reader with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_IRC_LINE_LEN)
    }

    /// Reader with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            incomplete: None,
            max_len,
            discarding: false,
        }
    }

    /// The buffered fragment that has not been terminated yet.
    pub fn pending(&self) -> Option<&str> {
        self.incomplete.as_deref()
    }

    /// Drop any buffered fragment.
    pub fn reset(&mut self) {
        self.incomplete = None;
        self.discarding = false;
    }

    /// Feed one chunk and collect every line it completes.
    ///
    /// Lines are returned without their `\r\n` / `\n` terminator. Blank lines
    /// are skipped. Lines longer than the limit are dropped with a warning.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.find('\n') {
            let segment = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }

            let line = match self.incomplete.take() {
                Some(mut head) => {
                    head.push_str(segment);
                    head
                }
                None => segment.to_owned(),
            };
            self.accept(line, &mut lines);
        }

        if !rest.is_empty() && !self.discarding {
            let tail = self.incomplete.get_or_insert_with(String::new);
            tail.push_str(rest);
            if tail.len() > self.max_len {
                let actual = tail.len();
                self.incomplete = None;
                self.discarding = true;
                warn!(
                    error = %ProtocolError::MessageTooLong { actual, limit: self.max_len },
                    "dropping unterminated line"
                );
            }
        }

        lines
    }

    fn accept(&self, mut line: String, out: &mut Vec<String>) {
        if line.ends_with('\r') {
            line.pop();
        }
        if line.is_empty() {
            return;
        }
        if line.len() > self.max_len {
            warn!(
                error = %ProtocolError::MessageTooLong { actual: line.len(), limit: self.max_len },
                "dropping line"
            );
            return;
        }
        out.push(line);
    }
}
