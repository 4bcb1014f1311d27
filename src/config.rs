//! Parser and writer configuration.
//!
//! Configuration is validated once, at construction, and immutable
//! afterwards. Both structs implement `Default` matching the documented
//! defaults.

use crate::error::ConfigError;

/// Configuration for [`crate::parser::Parser`] and
/// [`crate::streaming::StreamingParser`].
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub delimiter: u8,
    pub quote: u8,
    /// Backslash-style escape byte. When set (and distinct from `quote`),
    /// it is layered on top of doubled-quote decoding inside quoted fields.
    pub escape: Option<u8>,
    /// Lines beginning with this byte (at the start of the row, in
    /// `IN_FIELD` mode) are skipped entirely.
    pub comment: Option<u8>,
    pub trim: bool,
    pub skip_empty_lines: bool,
    /// When set, structural errors resynchronise at the next LF rather than
    /// aborting the parse.
    pub skip_lines_with_error: bool,
    /// Reserved for future relaxed-mode tolerances (unused today beyond
    /// being threaded through so callers can opt in once added).
    pub relaxed: bool,
    /// 0 means unlimited.
    pub max_row_size: usize,
    /// 1-based inclusive row-delivery window. `to_line == 0` means
    /// unbounded.
    pub from_line: u64,
    pub to_line: u64,
    /// Cap on the internal buffer a [`crate::streaming::StreamingParser`]
    /// will grow to before reporting `Error::Allocation`.
    pub max_buffer_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            trim: false,
            skip_empty_lines: false,
            skip_lines_with_error: false,
            relaxed: false,
            max_row_size: 0,
            from_line: 1,
            to_line: 0,
            max_buffer_size: crate::streaming::DEFAULT_MAX_BUFFER,
        }
    }
}

impl ParserConfig {
    /// Validate and freeze a configuration. Mirrors the checks `cisv`
    /// performs at `cisv_parser_create_with_config` time.
    pub fn build(self) -> Result<Self, ConfigError> {
        if self.delimiter == 0 || self.delimiter == b'\n' || self.delimiter == b'\r' {
            return Err(ConfigError::InvalidDelimiter);
        }
        if self.quote == b'\n' || self.quote == b'\r' {
            return Err(ConfigError::InvalidQuote);
        }
        if self.delimiter == self.quote {
            return Err(ConfigError::DelimiterQuoteCollision);
        }
        if let Some(escape) = self.escape {
            if escape == self.quote {
                return Err(ConfigError::EscapeQuoteCollision);
            }
        }
        Ok(self)
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_escape(mut self, escape: u8) -> Self {
        self.escape = Some(escape);
        self
    }

    pub fn with_comment(mut self, comment: u8) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }

    pub fn with_skip_lines_with_error(mut self, skip: bool) -> Self {
        self.skip_lines_with_error = skip;
        self
    }

    pub fn with_max_row_size(mut self, max: usize) -> Self {
        self.max_row_size = max;
        self
    }

    pub fn with_line_window(mut self, from_line: u64, to_line: u64) -> Self {
        self.from_line = from_line;
        self.to_line = to_line;
        self
    }
}

/// Configuration for [`crate::writer::Writer`].
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub delimiter: u8,
    pub quote: u8,
    pub always_quote: bool,
    pub use_crlf: bool,
    /// Bytes substituted for a `None` field. Defaults to empty (not
    /// `NULL`-the-word) so a missing field round-trips as an empty field.
    pub null_string: Vec<u8>,
    /// Buffer capacity; floor enforced at 64 KiB in [`Self::build`].
    pub buffer_capacity: usize,
    /// Output character encoding applied after quoting (supplemented
    /// feature, §1.A).
    pub encoding: crate::writer::EncodingTarget,
    /// Optional CSV-formula-injection guard (supplemented feature, §1.A).
    pub formula_guard: Option<crate::writer::FormulaConfig>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            delimiter: b',',
            quote: b'"',
            always_quote: false,
            use_crlf: false,
            null_string: Vec::new(),
            buffer_capacity: 1024 * 1024,
            encoding: crate::writer::EncodingTarget::Utf8,
            formula_guard: None,
        }
    }
}

impl WriterConfig {
    pub fn build(mut self) -> Result<Self, ConfigError> {
        if self.delimiter == 0 || self.delimiter == b'\n' || self.delimiter == b'\r' {
            return Err(ConfigError::InvalidDelimiter);
        }
        if self.quote == b'\n' || self.quote == b'\r' {
            return Err(ConfigError::InvalidQuote);
        }
        if self.delimiter == self.quote {
            return Err(ConfigError::DelimiterQuoteCollision);
        }
        const BUFFER_FLOOR: usize = 64 * 1024;
        if self.buffer_capacity < BUFFER_FLOOR {
            self.buffer_capacity = BUFFER_FLOOR;
        }
        Ok(self)
    }

    pub fn with_always_quote(mut self, always_quote: bool) -> Self {
        self.always_quote = always_quote;
        self
    }

    pub fn with_crlf(mut self, use_crlf: bool) -> Self {
        self.use_crlf = use_crlf;
        self
    }

    pub fn with_null_string(mut self, null_string: impl Into<Vec<u8>>) -> Self {
        self.null_string = null_string.into();
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_encoding(mut self, encoding: crate::writer::EncodingTarget) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_formula_guard(mut self, guard: crate::writer::FormulaConfig) -> Self {
        self.formula_guard = Some(guard);
        self
    }
}
