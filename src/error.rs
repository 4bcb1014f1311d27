//! Error types for the parser, writer, and transform pipeline.
//!
//! One variant per error kind named in the design: configuration, I/O,
//! allocation, structural, and overflow. Each variant carries enough context
//! to act on without string-parsing the message.

/// The single error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration detected at parser/writer construction time.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// I/O failure reading a file or flushing a sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A growable buffer could not be grown further, or a configured maximum
    /// (e.g. the streaming buffer cap) was exceeded.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// A quoted field was never closed before end-of-input.
    #[error("unterminated quoted field at or after line {line}")]
    UnterminatedQuote {
        /// 1-based line on which the quote was opened.
        line: u64,
    },

    /// A row exceeded the configured `max_row_size`.
    #[error("row exceeds maximum size of {limit} bytes at line {line}")]
    RowTooLarge {
        /// 1-based line at which the limit was hit.
        line: u64,
        /// The configured limit.
        limit: usize,
    },

    /// Length arithmetic (writer quoting, base64 sizing) would overflow.
    #[error("integer overflow computing output length: {0}")]
    Overflow(&'static str),

    /// A `custom` transform's callback failed; per spec, the original bytes
    /// are used unchanged and this is surfaced for diagnostics only.
    #[error("custom transform failed: {0}")]
    Transform(String),
}

/// Configuration errors, detected before a parser or writer is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("delimiter must not be NUL, LF, or CR")]
    InvalidDelimiter,
    #[error("quote must not be LF or CR")]
    InvalidQuote,
    #[error("delimiter and quote must differ")]
    DelimiterQuoteCollision,
    #[error("escape byte must differ from quote")]
    EscapeQuoteCollision,
}
