//! Bounded in-memory capture of a process output stream.

/// Keeps at most `max_bytes` of the most recent output.
///
/// Older output is discarded; [`BoundedCapture::finish`] reports how many bytes
/// were dropped. Memory use stays under `2 * max_bytes` plus one pushed chunk.
#[derive(Debug, Clone)]
pub struct BoundedCapture {
    buf: String,
    max_bytes: usize,
    dropped: usize,
}

impl BoundedCapture {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buf: String::new(),
            max_bytes: max_bytes.max(1),
            dropped: 0,
        }
    }

    /// Append one line (a trailing newline is added).
    pub fn push_line(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push('\n');
        self.maybe_compact();
    }

    /// Append raw text with no line terminator, e.g. part of an overlong line.
    pub fn push(&mut self, text: &str) {
        self.buf.push_str(text);
        self.maybe_compact();
    }

    /// Final captured text, trimmed to the byte cap.
    pub fn finish(mut self) -> (String, usize) {
        self.compact();
        (self.buf, self.dropped)
    }

    fn maybe_compact(&mut self) {
        if self.buf.len() > self.max_bytes.saturating_mul(2) {
            self.compact();
        }
    }

    fn compact(&mut self) {
        if self.buf.len() <= self.max_bytes {
            return;
        }
        let mut cut = self.buf.len() - self.max_bytes;
        while !self.buf.is_char_boundary(cut) {
            cut += 1;
        }
        self.buf.drain(..cut);
        self.dropped += cut;
    }
}
