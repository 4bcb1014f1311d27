//! Component F: writer.
//!
//! Symmetric counterpart to the parser: given field bytes, produces RFC
//! 4180 output (quoting exactly the fields that need it, doubling embedded
//! quotes), with two supplemented features layered on top per SPEC_FULL.md
//! §1.A — output character re-encoding and a CSV-formula-injection guard.

pub mod encoding;

pub use encoding::EncodingTarget;

use crate::classifier::Classifier;
use crate::config::WriterConfig;
use crate::error::Error;
use std::io::Write;

/// A field whose encoded size would exceed this many bytes bypasses the
/// internal buffer entirely and is written to the sink in fixed-size
/// chunks, rather than growing `buf` past its configured capacity.
const DIRECT_WRITE_CHUNK: usize = 4 * 1024;

/// Per-field write-time decision and operation, mirroring the table in
/// SPEC_FULL.md §4.F: does this field need quoting, does it need the
/// formula-injection prefix, what encoding applies on the way out.
pub struct Writer<W: Write> {
    /// `None` only after [`Self::into_inner`] has taken it; every other
    /// method runs before that point, so `sink_mut` never sees `None`.
    sink: Option<W>,
    config: WriterConfig,
    classifier: Classifier,
    field_index_in_row: usize,
    scratch: Vec<u8>,
    /// Output staging buffer; flushed to `sink` once it would exceed
    /// `config.buffer_capacity`.
    buf: Vec<u8>,
    rows_written: u64,
    bytes_written: u64,
}

/// Guards against CSV/TSV formula injection when a file is later opened in
/// a spreadsheet application: a leading `=`, `+`, `-`, or `@` is treated as
/// a formula trigger by several common spreadsheet programs, so fields
/// starting with one of those bytes are prefixed with `prefix` (typically a
/// single quote) before quoting is decided.
#[derive(Debug, Clone)]
pub struct FormulaConfig {
    pub trigger_bytes: Vec<u8>,
    pub prefix: Vec<u8>,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        FormulaConfig {
            trigger_bytes: vec![b'=', b'+', b'-', b'@'],
            prefix: vec![b'\''],
        }
    }
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, config: WriterConfig) -> Self {
        let classifier = Classifier::new(config.delimiter, config.quote);
        let buf = Vec::with_capacity(config.buffer_capacity.min(1024 * 1024));
        Writer {
            sink: Some(sink),
            config,
            classifier,
            field_index_in_row: 0,
            scratch: Vec::with_capacity(256),
            buf,
            rows_written: 0,
            bytes_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// The sink, available on every path except after [`Self::into_inner`]
    /// has consumed the writer.
    fn sink_mut(&mut self) -> &mut W {
        match &mut self.sink {
            Some(sink) => sink,
            None => unreachable!("writer sink taken"),
        }
    }

    /// Stage `bytes` for output, flushing the internal buffer first if it
    /// would overflow `buffer_capacity`. A single chunk larger than the
    /// whole buffer bypasses it and goes straight to the sink in fixed-size
    /// pieces, per the writer's buffer-discipline fallback path.
    fn write_out(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() > self.config.buffer_capacity {
            self.flush_buf()?;
            for chunk in bytes.chunks(DIRECT_WRITE_CHUNK) {
                self.sink_mut().write_all(chunk)?;
            }
        } else {
            if self.buf.len() + bytes.len() > self.config.buffer_capacity {
                self.flush_buf()?;
            }
            self.buf.extend_from_slice(bytes);
        }
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn flush_buf(&mut self) -> Result<(), Error> {
        if !self.buf.is_empty() {
            let buf = std::mem::take(&mut self.buf);
            self.sink_mut().write_all(&buf)?;
        }
        Ok(())
    }

    /// Write one field. Call [`Self::end_row`] after the last field of a
    /// row.
    pub fn write_field(&mut self, field: &[u8]) -> Result<(), Error> {
        if self.field_index_in_row > 0 {
            self.write_out(&[self.config.delimiter])?;
        }

        let guarded = self.apply_formula_guard(field);
        let field_ref: &[u8] = guarded.as_deref().unwrap_or(field);

        let needs_quoting = self.config.always_quote || self.field_needs_quoting(field_ref);

        // Output length bound for a fully-quoted field (every byte doubled
        // plus the two bracketing quotes); checked rather than assumed so a
        // pathological field length reports `Error::Overflow` instead of
        // wrapping.
        field_ref
            .len()
            .checked_mul(2)
            .and_then(|doubled| doubled.checked_add(2))
            .ok_or(Error::Overflow("writer field encode bound"))?;

        self.scratch.clear();
        if needs_quoting {
            self.scratch.push(self.config.quote);
            let mut start = 0;
            for (i, &b) in field_ref.iter().enumerate() {
                if b == self.config.quote {
                    self.scratch.extend_from_slice(&field_ref[start..=i]);
                    self.scratch.push(self.config.quote);
                    start = i + 1;
                }
            }
            self.scratch.extend_from_slice(&field_ref[start..]);
            self.scratch.push(self.config.quote);
        } else {
            self.scratch.extend_from_slice(field_ref);
        }

        if self.config.encoding == EncodingTarget::Utf8 {
            // `write_out` needs `&mut self` and the bytes at once; swap
            // `scratch` out rather than clone it, restoring it afterwards
            // so its allocation is reused on the next field.
            let ready = std::mem::take(&mut self.scratch);
            let result = self.write_out(&ready);
            self.scratch = ready;
            self.scratch.clear();
            result?;
        } else {
            let mut encoded = Vec::with_capacity(self.scratch.len());
            encoding::encode_utf8_extend(&self.scratch, self.config.encoding, &mut encoded);
            self.write_out(&encoded)?;
        }

        self.field_index_in_row += 1;
        Ok(())
    }

    /// Write `None` as the configured null-string and `Some` as a normal
    /// field. Gives callers working with optional data parity with the
    /// writer's `null_string` configuration without hand-encoding it.
    pub fn write_optional_field(&mut self, field: Option<&[u8]>) -> Result<(), Error> {
        match field {
            Some(bytes) => self.write_field(bytes),
            None => {
                let null = self.config.null_string.clone();
                self.write_field(&null)
            }
        }
    }

    /// Write an integer field without the caller formatting it first.
    pub fn write_field_int(&mut self, value: i64) -> Result<(), Error> {
        self.write_field(value.to_string().as_bytes())
    }

    /// Write a floating-point field without the caller formatting it first.
    pub fn write_field_float(&mut self, value: f64) -> Result<(), Error> {
        self.write_field(format!("{value}").as_bytes())
    }

    /// Terminate the current row (CRLF or LF per configuration) and reset
    /// field position for the next row.
    pub fn end_row(&mut self) -> Result<(), Error> {
        if self.config.use_crlf {
            self.write_out(b"\r\n")?;
        } else {
            self.write_out(b"\n")?;
        }
        self.field_index_in_row = 0;
        self.rows_written += 1;
        Ok(())
    }

    /// Write a whole row (every field, then the row terminator).
    pub fn write_row<I, T>(&mut self, fields: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for field in fields {
            self.write_field(field.as_ref())?;
        }
        self.end_row()
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.flush_buf()?;
        self.sink_mut().flush()?;
        Ok(())
    }

    /// Recover the sink, flushing the internal buffer best-effort first (a
    /// caller that needs to observe a flush failure should call
    /// [`Self::flush`] before this).
    pub fn into_inner(mut self) -> W {
        let _ = self.flush_buf();
        match self.sink.take() {
            Some(sink) => sink,
            None => unreachable!("writer sink taken"),
        }
    }

    fn field_needs_quoting(&self, field: &[u8]) -> bool {
        field.iter().any(|&b| {
            self.classifier.is_delimiter(b)
                || self.classifier.is_quote(b)
                || self.classifier.is_lf(b)
                || self.classifier.is_cr(b)
        })
    }

    fn apply_formula_guard(&self, field: &[u8]) -> Option<Vec<u8>> {
        let guard = self.config.formula_guard.as_ref()?;
        let first = *field.first()?;
        if !guard.trigger_bytes.contains(&first) {
            return None;
        }
        let mut guarded = Vec::with_capacity(guard.prefix.len() + field.len());
        guarded.extend_from_slice(&guard.prefix);
        guarded.extend_from_slice(field);
        Some(guarded)
    }
}

/// Best-effort flush on drop. A caller that needs to know whether the final
/// flush succeeded must call [`Writer::flush`] explicitly before the writer
/// goes out of scope.
impl<W: Write> Drop for Writer<W> {
    fn drop(&mut self) {
        let _ = self.flush_buf();
        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_rows(config: WriterConfig, rows: &[&[&str]]) -> String {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(&mut buf, config);
            for row in rows {
                writer.write_row(row.iter().map(|f| f.as_bytes())).unwrap();
            }
            writer.flush().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn w1_plain_fields_are_not_quoted() {
        let out = write_rows(WriterConfig::default(), &[&["a", "b", "c"]]);
        assert_eq!(out, "a,b,c\n");
    }

    #[test]
    fn w2_fields_with_delimiter_or_quote_are_quoted_and_escaped() {
        let out = write_rows(
            WriterConfig::default(),
            &[&["hello, world", "he said \"hi\""]],
        );
        assert_eq!(out, "\"hello, world\",\"he said \"\"hi\"\"\"\n");
    }

    #[test]
    fn w3_always_quote_quotes_every_field() {
        let config = WriterConfig::default().with_always_quote(true);
        let out = write_rows(config, &[&["a", "b"]]);
        assert_eq!(out, "\"a\",\"b\"\n");
    }

    #[test]
    fn crlf_line_terminator() {
        let config = WriterConfig::default().with_crlf(true);
        let out = write_rows(config, &[&["a", "b"]]);
        assert_eq!(out, "a,b\r\n");
    }

    #[test]
    fn formula_guard_prefixes_triggering_fields() {
        let config = WriterConfig::default().with_formula_guard(FormulaConfig::default());
        let out = write_rows(config, &[&["=SUM(A1:A2)", "plain"]]);
        assert_eq!(out, "'=SUM(A1:A2),plain\n");
    }

    #[test]
    fn formula_guard_leaves_ordinary_fields_alone() {
        let config = WriterConfig::default().with_formula_guard(FormulaConfig::default());
        let out = write_rows(config, &[&["ordinary", "-5"]]);
        assert_eq!(out, "ordinary,'-5\n");
    }

    #[test]
    fn write_optional_field_uses_null_string() {
        let config = WriterConfig::default().with_null_string("NULL");
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(&mut buf, config);
            writer.write_optional_field(Some(b"x")).unwrap();
            writer.write_optional_field(None).unwrap();
            writer.end_row().unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "x,NULL\n");
    }

    #[test]
    fn write_field_int_and_float_format_without_caller_conversion() {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(&mut buf, WriterConfig::default());
            writer.write_field_int(-42).unwrap();
            writer.write_field_float(3.5).unwrap();
            writer.end_row().unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "-42,3.5\n");
    }

    #[test]
    fn parser_writer_round_trip_preserves_fields() {
        use crate::config::ParserConfig;
        use crate::rows::Parser;

        let rows_in: &[&[&str]] = &[&["a", "b,c", "he said \"hi\""], &["", "plain"]];
        let out = write_rows(WriterConfig::default(), rows_in);

        let parser = Parser::new(ParserConfig::default()).unwrap();
        let parsed = parser.parse(out.as_bytes()).unwrap();

        let as_strings: Vec<Vec<String>> = parsed
            .iter()
            .map(|r| r.iter().map(|f| String::from_utf8_lossy(f).to_string()).collect())
            .collect();
        let expected: Vec<Vec<String>> = rows_in
            .iter()
            .map(|r| r.iter().map(|f| f.to_string()).collect())
            .collect();
        assert_eq!(as_strings, expected);
    }
}
