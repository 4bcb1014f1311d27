//! One-shot and lazy consumer surface built on [`crate::streaming`].
//!
//! Per the design note on preferring an iterator/lazy-sequence model over
//! C-style row callbacks, [`Parser::rows`] drives the underlying
//! [`crate::streaming::StreamingParser`] in fixed-size internal chunks and
//! yields rows as they become available, rather than materialising the
//! whole output before returning anything. [`Parser::for_each_row`] is kept
//! alongside it for callback-style callers (e.g. an embedding layer that
//! cannot hold a live borrow across calls).

use crate::config::ParserConfig;
use crate::error::Error;
use crate::parser::Row;
use crate::streaming::StreamingParser;
use std::io::Read;
use std::path::Path;

/// Internal chunk size fed to the streaming parser by [`Parser::rows`] and
/// [`Parser::parse_file`]. Large enough to amortise the per-feed scan setup,
/// small enough that `rows()` stays meaningfully lazy.
const INTERNAL_CHUNK: usize = 64 * 1024;

/// A one-shot/lazy CSV reader over an in-memory byte slice or a file.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Validates `config` up front so every later call — `parse`,
    /// `parse_file`, `rows`, `for_each_row` — can trust it rather than
    /// re-checking delimiter/quote collisions on every internal
    /// [`StreamingParser`] it spins up.
    pub fn new(config: ParserConfig) -> Result<Self, Error> {
        Ok(Parser { config: config.build()? })
    }

    /// Parse the entirety of `input` and return every row. Convenience
    /// wrapper over [`crate::streaming::StreamingParser`] for callers who
    /// want the whole result at once.
    pub fn parse(&self, input: &[u8]) -> Result<Vec<Row>, Error> {
        let mut sp = StreamingParser::new(self.config.clone());
        sp.feed(input)?;
        sp.finalize()
    }

    /// Read and parse a file. Streams it through in fixed-size chunks
    /// rather than requiring the whole file to be read into memory first.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Vec<Row>, Error> {
        let mut file = std::fs::File::open(path)?;
        let mut sp = StreamingParser::new(self.config.clone());
        let mut buf = vec![0u8; INTERNAL_CHUNK];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sp.feed(&buf[..n])?;
        }
        sp.finalize()
    }

    /// A lazy row iterator over `input`. Rows are produced as the
    /// underlying streaming parser is fed successive internal chunks, not
    /// all at once up front.
    pub fn rows<'a>(&self, input: &'a [u8]) -> RowIter<'a> {
        RowIter {
            config: self.config.clone(),
            remaining: input,
            sp: StreamingParser::new(self.config.clone()),
            buffered: std::collections::VecDeque::new(),
            fed_all: false,
            finished: false,
            error_reported: false,
        }
    }

    /// Callback-parity form: invoke `on_row` for every row as it completes,
    /// without collecting the full result. Streams the input in internal
    /// chunks exactly like [`Self::parse_file`].
    pub fn for_each_row<F>(&self, input: &[u8], mut on_row: F) -> Result<(), Error>
    where
        F: FnMut(&Row) -> Result<(), Error>,
    {
        let mut sp = StreamingParser::new(self.config.clone());
        for chunk in input.chunks(INTERNAL_CHUNK) {
            sp.feed(chunk)?;
            for row in sp.drain_rows() {
                on_row(&row)?;
            }
        }
        for row in sp.finalize()? {
            on_row(&row)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }
}

/// Lazy row iterator returned by [`Parser::rows`].
pub struct RowIter<'a> {
    #[allow(dead_code)]
    config: ParserConfig,
    remaining: &'a [u8],
    sp: StreamingParser,
    buffered: std::collections::VecDeque<Row>,
    fed_all: bool,
    finished: bool,
    error_reported: bool,
}

impl<'a> RowIter<'a> {
    pub fn line_number(&self) -> u64 {
        self.sp.line_number()
    }
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error_reported {
            return None;
        }
        loop {
            if let Some(row) = self.buffered.pop_front() {
                return Some(Ok(row));
            }
            if self.finished {
                return None;
            }
            if self.fed_all {
                match self.sp.end() {
                    Ok(()) => {
                        self.finished = true;
                        self.buffered.extend(self.sp.drain_rows());
                        continue;
                    }
                    Err(e) => {
                        self.finished = true;
                        self.error_reported = true;
                        return Some(Err(e));
                    }
                }
            }
            let take = self.remaining.len().min(INTERNAL_CHUNK);
            let (chunk, rest) = self.remaining.split_at(take);
            self.remaining = rest;
            if chunk.is_empty() {
                self.fed_all = true;
                continue;
            }
            match self.sp.feed(chunk) {
                Ok(_) => {
                    self.buffered.extend(self.sp.drain_rows());
                    if self.remaining.is_empty() {
                        self.fed_all = true;
                    }
                }
                Err(e) => {
                    self.finished = true;
                    self.error_reported = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(rows: &[Row]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|f| String::from_utf8_lossy(f).to_string()).collect())
            .collect()
    }

    #[test]
    fn parse_collects_all_rows() {
        let parser = Parser::new(ParserConfig::default()).unwrap();
        let rows = parser.parse(b"a,b\nc,d\n").unwrap();
        assert_eq!(strs(&rows), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn rows_iterator_matches_parse() {
        let parser = Parser::new(ParserConfig::default()).unwrap();
        let input = b"a,b,c\n\"d,e\",f\ng,h,i\n";
        let via_parse = parser.parse(input).unwrap();
        let via_iter: Vec<Row> = parser.rows(input).collect::<Result<_, _>>().unwrap();
        assert_eq!(strs(&via_parse), strs(&via_iter));
    }

    #[test]
    fn rows_iterator_surfaces_unterminated_quote_error() {
        let parser = Parser::new(ParserConfig::default()).unwrap();
        let mut iter = parser.rows(b"a,\"unterminated");
        let last = iter.by_ref().last();
        assert!(matches!(last, Some(Err(Error::UnterminatedQuote { .. }))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn for_each_row_visits_every_row_in_order() {
        let parser = Parser::new(ParserConfig::default()).unwrap();
        let mut seen = Vec::new();
        parser
            .for_each_row(b"a,b\nc,d\ne,f\n", |row| {
                seen.push(String::from_utf8_lossy(&row[0]).to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec!["a", "c", "e"]);
    }

    #[test]
    fn new_rejects_an_invalid_config() {
        let config = ParserConfig::default().with_delimiter(b'"');
        assert!(matches!(Parser::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn rows_iterator_is_lazy_over_large_input() {
        let parser = Parser::new(ParserConfig::default()).unwrap();
        let mut input = Vec::new();
        for i in 0..10_000 {
            input.extend_from_slice(format!("row{i},value{i}\n").as_bytes());
        }
        let mut iter = parser.rows(&input);
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first[0], b"row0");
        // Only a fraction of the input should have been consumed to
        // produce the first row.
        assert!(iter.remaining.len() < input.len());
    }
}
