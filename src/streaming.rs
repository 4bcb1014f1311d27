//! Component D: streaming feed.
//!
//! Wraps [`crate::parser::ParserCore`] with the bounded-buffer, chunk-at-a-
//! time surface described in SPEC_FULL.md §4.D. Modelled directly on the
//! teacher's `strategy/streaming.rs::StreamingParser`: callers push bytes as
//! they arrive (network socket, decompression stage, file reader) and drain
//! whatever complete rows have become available between pushes.

use crate::config::ParserConfig;
use crate::error::Error;
use crate::parser::{ParserCore, Row};

/// Default cap on the internal buffer before a feed returns
/// [`Error::Allocation`]. Matches the teacher's default.
pub const DEFAULT_MAX_BUFFER: usize = 256 * 1024 * 1024;

/// A chunked CSV parser: feed it bytes as they arrive, drain rows as they
/// complete. Safe to feed one byte at a time or the whole file at once —
/// the result is identical either way (see the `streaming_equals_whole_input`
/// test on [`crate::parser::ParserCore`]).
pub struct StreamingParser {
    core: ParserCore,
    finished: bool,
}

impl StreamingParser {
    pub fn new(config: ParserConfig) -> Self {
        StreamingParser {
            core: ParserCore::new(config),
            finished: false,
        }
    }

    /// Push a chunk of input. Returns the number of rows newly available
    /// after processing this chunk (also retrievable via [`Self::take_rows`]
    /// / [`Self::drain_rows`]).
    pub fn feed(&mut self, chunk: &[u8]) -> Result<usize, Error> {
        let before = self.core.available_rows();
        self.core.feed(chunk)?;
        Ok(self.core.available_rows() - before)
    }

    /// Signal end-of-input. After this call, [`Self::drain_rows`] returns
    /// any trailing row, and further [`Self::feed`] calls are an error.
    pub fn end(&mut self) -> Result<(), Error> {
        self.core.end()?;
        self.finished = true;
        Ok(())
    }

    /// Take up to `max` buffered rows without requiring [`Self::end`] to
    /// have been called.
    pub fn take_rows(&mut self, max: usize) -> Vec<Row> {
        self.core.take_rows(max)
    }

    /// Drain every row currently buffered.
    pub fn drain_rows(&mut self) -> Vec<Row> {
        self.core.take_rows(self.core.available_rows())
    }

    /// Number of rows currently buffered and not yet taken.
    pub fn available_rows(&self) -> usize {
        self.core.available_rows()
    }

    /// Current 1-based line number the parser has reached.
    pub fn line_number(&self) -> u64 {
        self.core.line_number()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Call `end()` if not already finished, then return every remaining
    /// buffered row. Convenience for callers that always drain to
    /// completion.
    pub fn finalize(&mut self) -> Result<Vec<Row>, Error> {
        if !self.finished {
            self.end()?;
        }
        Ok(self.core.take_rows(self.core.available_rows()))
    }
}
