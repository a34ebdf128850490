use crate::domain::config::DEFAULT_MAX_LINE_LENGTH;
use tracing::{debug, warn};

/// Accumulates raw serial bytes and yields complete lines.
///
/// Lines are split on an arbitrary multi-byte terminator which is not part
/// of the yielded line. Bytes after the last terminator stay buffered until
/// more data arrives. A line growing past `max_line` bytes is discarded up
/// to and including its terminator.
#[derive(Debug)]
pub struct LineBuffer {
    terminator: Vec<u8>,
    pending: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl LineBuffer {
    pub fn new(terminator: &str) -> Self {
        Self::with_limit(terminator, DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_limit(terminator: &str, max_line: usize) -> Self {
        let terminator = if terminator.is_empty() {
            b"\n".to_vec()
        } else {
            terminator.as_bytes().to_vec()
        };

        Self {
            max_line: max_line.max(terminator.len()),
            terminator,
            pending: Vec::with_capacity(256),
            discarding: false,
        }
    }

    /// Append a chunk and drain every complete line it finishes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // earlier bytes were already searched; only a split terminator can reach back
        let mut search_from = self.pending.len().saturating_sub(self.terminator.len() - 1);
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.find_terminator(search_from) {
            let line: Vec<u8> = self.pending.drain(..pos + self.terminator.len()).collect();
            if self.discarding {
                debug!("Resynchronised on line terminator after oversized line");
                self.discarding = false;
            } else {
                lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
            }
            search_from = 0;
        }

        if self.pending.len() > self.max_line {
            if !self.discarding {
                warn!(
                    "Serial line longer than {} bytes without a terminator, discarding it",
                    self.max_line
                );
                self.discarding = true;
            }
            // keep a possible terminator prefix
            let keep = self.terminator.len() - 1;
            let excess = self.pending.len() - keep;
            self.pending.drain(..excess);
        }

        lines
    }

    /// Bytes received since the last complete line
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Whether an oversized line is being skipped
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    fn find_terminator(&self, from: usize) -> Option<usize> {
        self.pending[from..]
            .windows(self.terminator.len())
            .position(|window| window == self.terminator.as_slice())
            .map(|pos| pos + from)
    }
}
