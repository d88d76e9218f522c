//! Line-at-a-time input for the session loop.
//!
//! A closed stream is not an error: the pending read resolves with whatever
//! partial text arrived (often nothing), and every later read resolves with
//! an empty string straight away.

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Something that hands out one line per call. `&mut self` keeps at most
/// one read in flight.
#[async_trait]
pub trait LineSource: Send {
    async fn read_line(&mut self) -> Result<String>;
}

/// Buffered reader over an async byte stream.
pub struct InputReader<R> {
    reader: R,
    closed: bool,
}

impl InputReader<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> InputReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            closed: false,
        }
    }

    /// True once end-of-stream has been seen.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for InputReader<R> {
    async fn read_line(&mut self) -> Result<String> {
        if self.closed {
            return Ok(String::new());
        }

        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf).await?;

        // No trailing newline means the stream ended mid-line (or was empty).
        if n == 0 || buf.last() != Some(&b'\n') {
            log::debug!("input closed");
            self.closed = true;
        }

        // Bad bytes become U+FFFD; the engine decides whether the answer is usable.
        let line = String::from_utf8_lossy(&buf);
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

/// Preset lines for tests. Behaves like a closed stream once drained.
pub struct ScriptedLines {
    lines: std::collections::VecDeque<String>,
    reads: usize,
}

impl ScriptedLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            reads: 0,
        }
    }

    /// Number of `read_line` calls so far, including ones past the end.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

#[async_trait]
impl LineSource for ScriptedLines {
    async fn read_line(&mut self) -> Result<String> {
        self.reads += 1;
        Ok(self.lines.pop_front().unwrap_or_default())
    }
}
