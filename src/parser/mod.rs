//! Component C: parser core state machine, and Component D: the streaming
//! feed built on top of it.
//!
//! The state machine is driven by the structural positions the scanner
//! (Component B) reports for the currently buffered, unconsumed input. It
//! owns the buffer, the quote accumulator, and the chunk-boundary
//! bookkeeping (pending-quote and pending-escape sub-states) described in
//! SPEC_FULL.md §4.C.

pub mod field;

use crate::classifier::Classifier;
use crate::config::ParserConfig;
use crate::error::Error;
use crate::scanner::{self, ScanMode, Scanner};
use std::collections::VecDeque;

/// Parser mode, per SPEC_FULL.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    InField,
    InQuotedField,
}

/// A completed row: owned field buffers, in column order.
pub type Row = Vec<Vec<u8>>;

/// The shared state-machine engine. Not exposed directly; wrapped by
/// [`crate::streaming::StreamingParser`] (chunked, owned) and by
/// [`crate::rows::Parser`] (one-shot, feeds the whole input as chunks
/// internally to stay within a single implementation of the transition
/// rules).
pub(crate) struct ParserCore {
    config: ParserConfig,
    classifier: Classifier,
    scanner: Box<dyn Scanner>,
    mode: Mode,

    /// Accumulated, not-yet-fully-consumed input.
    buffer: Vec<u8>,
    /// Start of the field currently being scanned, as an index into `buffer`.
    field_start: usize,
    /// Start of the row currently in progress, as an index into `buffer`.
    /// Used to detect the comment-line condition (`field_start ==
    /// row_start` in `IN_FIELD` mode) and to know how much of the buffer is
    /// safe to drop on compaction.
    row_start: usize,
    /// How far into the current field (`IN_FIELD` mode only) we've already
    /// confirmed is ordinary data. A quote byte found at a non-initial
    /// field position is data, not structure, but the scanner reports
    /// absolute positions relative to wherever it was asked to start; if we
    /// always rescanned from `field_start` we'd find that same data quote
    /// again on the next call and never progress. Reset to `field_start`
    /// whenever a field boundary moves; otherwise only ever increases.
    scan_cursor: usize,
    /// Owned accumulator for the content of the quoted field currently
    /// being decoded. Cleared when a new quoted field begins.
    quote_buffer: Vec<u8>,
    /// When the previous chunk ended with a quote byte while
    /// `IN_QUOTED_FIELD`, resolution (escaped quote vs. end of field) is
    /// deferred until the next byte arrives. `None` when not pending.
    pending_quote: bool,
    /// Mirror of `pending_quote` for the configured backslash `escape`
    /// byte: the previous chunk ended with an escape byte while
    /// `IN_QUOTED_FIELD`.
    pending_escape: bool,
    /// Set when a quoted field has just closed: `quote_buffer` holds its
    /// content, but emission is deferred until the terminating
    /// delimiter/LF is found, so that `buffer[field_start..pos]` (which is
    /// empty when the terminator immediately follows the closing quote)
    /// does not get emitted as a spurious second, empty field.
    quote_pending_emit: bool,
    /// Set after a structural error (currently only `RowTooLarge`) when
    /// `skip_lines_with_error` is configured: the row in progress has been
    /// discarded and we're scanning forward for the next LF to resume at.
    resyncing: bool,

    current_row: Row,
    complete_rows: VecDeque<Row>,

    line_num: u64,
    quote_opened_at_line: u64,
}

impl ParserCore {
    pub fn new(config: ParserConfig) -> Self {
        let classifier = Classifier::new(config.delimiter, config.quote);
        let scanner = scanner::best_available();
        ParserCore {
            config,
            classifier,
            scanner,
            mode: Mode::InField,
            buffer: Vec::new(),
            field_start: 0,
            row_start: 0,
            scan_cursor: 0,
            quote_buffer: Vec::new(),
            pending_quote: false,
            pending_escape: false,
            quote_pending_emit: false,
            resyncing: false,
            current_row: Vec::new(),
            complete_rows: VecDeque::new(),
            line_num: 1,
            quote_opened_at_line: 1,
        }
    }

    pub fn line_number(&self) -> u64 {
        self.line_num
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Feed a chunk of input, driving the state machine as far as the
    /// buffered data allows.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), Error> {
        if self.buffer.len() + chunk.len() > self.config.max_buffer_size {
            return Err(Error::Allocation(format!(
                "streaming buffer would exceed configured maximum of {} bytes",
                self.config.max_buffer_size
            )));
        }
        self.buffer.extend_from_slice(chunk);
        self.process_buffer()?;
        self.compact_if_useful();
        Ok(())
    }

    /// Finalise: emit a trailing field/row if one is pending, or report an
    /// unterminated quote.
    pub fn end(&mut self) -> Result<(), Error> {
        match self.mode {
            Mode::InQuotedField => {
                if self.pending_quote {
                    // Last byte of input was a closing quote with no
                    // lookahead byte available: it closes the field.
                    self.close_quoted_field();
                    self.pending_quote = false;
                    self.finish_trailing_field_and_row();
                    Ok(())
                } else {
                    Err(Error::UnterminatedQuote {
                        line: self.quote_opened_at_line,
                    })
                }
            }
            Mode::InField => {
                self.finish_trailing_field_and_row();
                Ok(())
            }
        }
    }

    fn finish_trailing_field_and_row(&mut self) {
        let trailing = self.buffer[self.field_start..].to_vec();
        if self.quote_pending_emit {
            let mut bytes = std::mem::take(&mut self.quote_buffer);
            bytes.extend_from_slice(&trailing);
            self.quote_pending_emit = false;
            self.emit_field(bytes);
        } else if !trailing.is_empty() || !self.current_row.is_empty() {
            self.emit_field(trailing);
        }
        if !self.current_row.is_empty() {
            self.emit_row();
        }
        self.field_start = self.buffer.len();
        self.row_start = self.buffer.len();
    }

    pub fn take_rows(&mut self, max: usize) -> Vec<Row> {
        let take = max.min(self.complete_rows.len());
        self.complete_rows.drain(..take).collect()
    }

    pub fn available_rows(&self) -> usize {
        self.complete_rows.len()
    }

    pub fn finalize(&mut self) -> Result<Vec<Row>, Error> {
        self.end()?;
        Ok(self.complete_rows.drain(..).collect())
    }

    // ------------------------------------------------------------------
    // Internal state machine
    // ------------------------------------------------------------------

    fn process_buffer(&mut self) -> Result<(), Error> {
        loop {
            if self.resyncing {
                if let Some(lf_rel) = self.buffer[self.field_start..].iter().position(|&b| b == b'\n')
                {
                    self.field_start += lf_rel + 1;
                    self.row_start = self.field_start;
                    self.scan_cursor = self.field_start;
                    self.line_num += 1;
                    self.resyncing = false;
                    continue;
                } else {
                    self.field_start = self.buffer.len();
                    return Ok(());
                }
            }

            // Resolve a pending-quote/pending-escape lookahead left over
            // from the previous feed() call, now that a new byte (if any)
            // is available.
            if self.mode == Mode::InQuotedField && (self.pending_quote || self.pending_escape) {
                if self.field_start >= self.buffer.len() {
                    // Still no lookahead byte; wait for more input.
                    return Ok(());
                }
                let next = self.buffer[self.field_start];
                if self.pending_quote {
                    self.pending_quote = false;
                    if next == self.config.quote {
                        self.quote_buffer.push(self.config.quote);
                        self.field_start += 1;
                    } else {
                        self.close_quoted_field();
                        // `field_start` already points at `next`; it will
                        // be reprocessed as ordinary quoted-mode content
                        // (or as the start of a new field if mode flipped
                        // to InField above) on the next loop iteration.
                    }
                } else {
                    // pending_escape
                    self.pending_escape = false;
                    self.quote_buffer.push(next);
                    self.field_start += 1;
                }
                continue;
            }

            match self.mode {
                Mode::InField => {
                    if !self.step_in_field()? {
                        return Ok(());
                    }
                }
                Mode::InQuotedField => {
                    if !self.step_in_quoted_field()? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Advance the `IN_FIELD` state by one structural event. Returns
    /// `Ok(false)` when no more progress can be made with the currently
    /// buffered data (caller should wait for more input).
    fn step_in_field(&mut self) -> Result<bool, Error> {
        // Comment-line check: only meaningful at the first byte of a row.
        if self.field_start == self.row_start {
            if let Some(comment) = self.config.comment {
                if self.field_start < self.buffer.len() && self.buffer[self.field_start] == comment
                {
                    return Ok(self.skip_comment_line());
                }
            }
        }

        if self.scan_cursor < self.field_start {
            self.scan_cursor = self.field_start;
        }

        let remainder = &self.buffer[self.scan_cursor..];
        if remainder.is_empty() {
            return Ok(false);
        }

        let mut positions = Vec::new();
        self.scanner
            .scan(remainder, &self.classifier, ScanMode::InField, &mut positions);

        let Some(&rel) = positions.first() else {
            // No delimiter, quote, or LF anywhere in the buffered
            // remainder: it's all unterminated field/row content so far.
            if self.row_size_exceeded_at(self.buffer.len()) {
                return self.fail_or_resync(self.row_too_large_error());
            }
            return Ok(false);
        };
        let pos = self.scan_cursor + rel;
        if self.row_size_exceeded_at(pos) {
            return self.fail_or_resync(self.row_too_large_error());
        }
        let byte = self.buffer[pos];

        if self.classifier.is_delimiter(byte) {
            let field = self.take_field_bytes(pos);
            self.emit_field(field);
            self.field_start = pos + 1;
            self.scan_cursor = self.field_start;
            return Ok(true);
        }

        if self.classifier.is_lf(byte) {
            let mut field_end = pos;
            if field_end > self.field_start && self.buffer[field_end - 1] == b'\r' {
                field_end -= 1;
            }
            let field = self.take_field_bytes(field_end);
            self.emit_field(field);
            self.emit_row();
            self.field_start = pos + 1;
            self.row_start = self.field_start;
            self.scan_cursor = self.field_start;
            self.line_num += 1;
            return Ok(true);
        }

        // Quote byte immediately reopening a field with no separator in
        // between (malformed input, e.g. `"a""b"` with no delimiter): flush
        // whatever was pending first so it isn't silently dropped.
        if pos == self.field_start {
            if self.quote_pending_emit {
                let field = self.take_field_bytes(pos);
                self.emit_field(field);
            }
            self.mode = Mode::InQuotedField;
            self.quote_buffer.clear();
            self.quote_opened_at_line = self.line_num;
            self.field_start = pos + 1;
            self.scan_cursor = self.field_start;
            return Ok(true);
        }

        // Quote in a non-initial position: data, per the parser's field
        // grammar. `field_start` stays put (the field is still open); only
        // the scan cursor advances past it, so the next call resumes
        // scanning just past this byte instead of finding it again.
        self.scan_cursor = pos + 1;
        Ok(true)
    }

    /// Advance the `IN_QUOTED_FIELD` state by one structural event.
    fn step_in_quoted_field(&mut self) -> Result<bool, Error> {
        let remainder = &self.buffer[self.field_start..];
        if remainder.is_empty() {
            return Ok(false);
        }

        let mut positions = Vec::new();
        self.scanner.scan(
            remainder,
            &self.classifier,
            ScanMode::InQuotedField,
            &mut positions,
        );

        // Escape-byte handling (backslash-style) takes priority over the
        // scanner's quote-only mask: scan the literal content up to the
        // next quote for an escape byte first, when configured.
        if let Some(escape) = self.config.escape {
            if let Some(rel) = remainder.iter().position(|&b| b == escape) {
                let quote_rel = positions.first().copied();
                if quote_rel.is_none() || rel < quote_rel.unwrap() {
                    let pos = self.field_start + rel;
                    if self.row_size_exceeded_at(pos) {
                        return self.fail_or_resync(self.row_too_large_error());
                    }
                    self.append_to_quote_buffer(self.field_start, pos);
                    if pos + 1 < self.buffer.len() {
                        let escaped_byte = self.buffer[pos + 1];
                        self.quote_buffer.push(escaped_byte);
                        self.field_start = pos + 2;
                    } else {
                        self.field_start = pos + 1;
                        self.pending_escape = true;
                    }
                    return Ok(true);
                }
            }
        }

        let Some(&rel) = positions.first() else {
            // No quote in the buffered remainder: it's all unterminated
            // quoted-field content so far.
            if self.row_size_exceeded_at(self.buffer.len()) {
                return self.fail_or_resync(self.row_too_large_error());
            }
            self.append_to_quote_buffer(self.field_start, self.buffer.len());
            self.field_start = self.buffer.len();
            return Ok(false);
        };

        let pos = self.field_start + rel;
        if self.row_size_exceeded_at(pos) {
            return self.fail_or_resync(self.row_too_large_error());
        }
        self.append_to_quote_buffer(self.field_start, pos);

        if pos + 1 < self.buffer.len() {
            self.field_start = pos + 1;
            if self.buffer[pos + 1] == self.config.quote {
                self.quote_buffer.push(self.config.quote);
                self.field_start = pos + 2;
            } else {
                self.close_quoted_field();
            }
            Ok(true)
        } else {
            // Quote is the last buffered byte: defer the decision.
            self.field_start = pos + 1;
            self.pending_quote = true;
            Ok(false)
        }
    }

    #[inline]
    fn append_to_quote_buffer(&mut self, start: usize, end: usize) {
        if end > start {
            self.quote_buffer.extend_from_slice(&self.buffer[start..end]);
        }
    }

    /// Resolve the bytes of a field ending at `field_end` (exclusive),
    /// accounting for a deferred quote-close: when set, the field's
    /// content lives in `quote_buffer`, with anything from `field_start`
    /// to `field_end` as literal trailing bytes (normally none).
    fn take_field_bytes(&mut self, field_end: usize) -> Vec<u8> {
        if self.quote_pending_emit {
            self.quote_pending_emit = false;
            let mut bytes = std::mem::take(&mut self.quote_buffer);
            bytes.extend_from_slice(&self.buffer[self.field_start..field_end]);
            bytes
        } else {
            self.buffer[self.field_start..field_end].to_vec()
        }
    }

    fn close_quoted_field(&mut self) {
        self.mode = Mode::InField;
        self.quote_pending_emit = true;
    }

    fn skip_comment_line(&mut self) -> bool {
        if let Some(lf_rel) = self.buffer[self.field_start..].iter().position(|&b| b == b'\n') {
            self.field_start += lf_rel + 1;
            self.row_start = self.field_start;
            self.line_num += 1;
            true
        } else {
            false
        }
    }

    fn emit_field(&mut self, mut bytes: Vec<u8>) {
        if self.config.trim {
            let trimmed = field::trim_whitespace(&bytes).to_vec();
            bytes = trimmed;
        }
        self.current_row.push(bytes);
    }

    fn emit_row(&mut self) {
        let row = std::mem::take(&mut self.current_row);

        let is_empty_row = row.len() == 1 && row[0].is_empty();
        if self.config.skip_empty_lines && is_empty_row {
            return;
        }

        if self.line_num < self.config.from_line {
            return;
        }
        if self.config.to_line != 0 && self.line_num > self.config.to_line {
            return;
        }

        self.complete_rows.push_back(row);
    }

    /// Whether the row currently in progress would exceed `max_row_size` if
    /// it extended up to (but not past) `pos`. `0` means unlimited. Callers
    /// pass either a genuine structural boundary (delimiter/quote/LF
    /// position) or the end of the buffered-but-unresolved remainder — both
    /// correctly bound "how much of this row exists so far", unlike
    /// `buffer.len()` in general, which may already hold unrelated rows
    /// queued up behind this one in a single large feed.
    fn row_size_exceeded_at(&self, pos: usize) -> bool {
        self.config.max_row_size != 0
            && pos.saturating_sub(self.row_start) > self.config.max_row_size
    }

    fn row_too_large_error(&self) -> Error {
        Error::RowTooLarge {
            line: self.line_num,
            limit: self.config.max_row_size,
        }
    }

    /// A structural error occurred. When `skip_lines_with_error` is set,
    /// discard the row in progress and resynchronise at the next LF instead
    /// of aborting the parse.
    fn fail_or_resync(&mut self, err: Error) -> Result<bool, Error> {
        if self.config.skip_lines_with_error {
            log::warn!("skipping malformed row: {err}");
            self.resyncing = true;
            self.mode = Mode::InField;
            self.quote_buffer.clear();
            self.quote_pending_emit = false;
            self.pending_quote = false;
            self.pending_escape = false;
            self.current_row.clear();
            Ok(true)
        } else {
            Err(err)
        }
    }

    fn compact_if_useful(&mut self) {
        if self.row_start > 0 && self.row_start >= self.buffer.len() / 2 {
            self.buffer.drain(0..self.row_start);
            self.field_start -= self.row_start;
            self.scan_cursor = self.scan_cursor.saturating_sub(self.row_start);
            self.row_start = 0;
        }
    }
}
