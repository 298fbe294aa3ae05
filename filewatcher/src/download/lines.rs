//! Line splitting for transfer tool output.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Longest line kept, in bytes. Anything beyond is dropped.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Reads lines terminated by `\n` or `\r`.
///
/// rsync redraws its progress line in place with carriage returns, so
/// splitting on newlines alone would hide every intermediate update. Invalid
/// UTF-8 is replaced rather than treated as an error, so a stream is always
/// drained to the end and the child never blocks on a full pipe. Lines
/// longer than the limit are truncated, so output without separators cannot
/// grow the buffer without bound.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    max_line_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
            max_line_len: MAX_LINE_LEN,
        }
    }

    /// Use a different line length limit (at least one byte).
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }

    /// Next line, or `None` at end of stream.
    ///
    /// Cancel safe: partial lines are kept across calls.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_pending()));
            }

            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    let room = self.max_line_len.saturating_sub(self.pending.len());
                    self.pending.extend_from_slice(&available[..pos.min(room)]);
                    self.reader.consume(pos + 1);
                    return Ok(Some(self.take_pending()));
                }
                None => {
                    let len = available.len();
                    let room = self.max_line_len.saturating_sub(self.pending.len());
                    self.pending.extend_from_slice(&available[..len.min(room)]);
                    self.reader.consume(len);
                }
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
