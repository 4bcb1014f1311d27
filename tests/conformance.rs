//! Cross-entry-point conformance tests.
//!
//! Each scenario runs through every entry point that should produce
//! identical output for the same input: the one-shot `Parser::parse`, the
//! chunked `StreamingParser` (fed one byte at a time, the hardest partition
//! to get right), the lazy `Parser::rows` iterator, and `parallel::parse_parallel`.
//! A failure pinpoints which entry point diverges from the others.

use fastcsv::config::ParserConfig;
use fastcsv::parallel;
use fastcsv::{Parser, Row, StreamingParser};

fn strs(rows: &[Row]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|f| String::from_utf8_lossy(f).to_string()).collect())
        .collect()
}

fn via_one_shot(config: &ParserConfig, input: &[u8]) -> Vec<Vec<String>> {
    strs(&Parser::new(config.clone()).unwrap().parse(input).unwrap())
}

fn via_streaming_byte_at_a_time(config: &ParserConfig, input: &[u8]) -> Vec<Vec<String>> {
    let mut sp = StreamingParser::new(config.clone());
    for b in input {
        sp.feed(&[*b]).unwrap();
    }
    strs(&sp.finalize().unwrap())
}

fn via_lazy_iterator(config: &ParserConfig, input: &[u8]) -> Vec<Vec<String>> {
    let parser = Parser::new(config.clone()).unwrap();
    strs(&parser.rows(input).collect::<Result<Vec<_>, _>>().unwrap())
}

fn via_parallel(config: &ParserConfig, input: &[u8]) -> Vec<Vec<String>> {
    strs(&parallel::parse_parallel(input, config).unwrap())
}

macro_rules! conformance {
    ($name:ident, $config:expr, $input:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let config = $config;
            let input: &[u8] = $input;
            let expected: Vec<Vec<&str>> = $expected;
            let expected: Vec<Vec<String>> =
                expected.into_iter().map(|r| r.into_iter().map(String::from).collect()).collect();

            assert_eq!(via_one_shot(&config, input), expected, "one_shot diverged");
            assert_eq!(
                via_streaming_byte_at_a_time(&config, input),
                expected,
                "streaming (byte-at-a-time) diverged"
            );
            assert_eq!(via_lazy_iterator(&config, input), expected, "lazy iterator diverged");
            assert_eq!(via_parallel(&config, input), expected, "parallel diverged");
        }
    };
}

conformance!(
    simple_two_rows,
    ParserConfig::default(),
    b"a,b,c\n1,2,3\n",
    vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]
);

conformance!(
    quoted_field_with_comma,
    ParserConfig::default(),
    b"\"hello, world\",b\n",
    vec![vec!["hello, world", "b"]]
);

conformance!(
    crlf_line_endings,
    ParserConfig::default(),
    b"a,b\r\nc,d\r\n",
    vec![vec!["a", "b"], vec!["c", "d"]]
);

conformance!(
    doubled_quote_escape,
    ParserConfig::default(),
    b"\"he said \"\"hi\"\"\",x\n",
    vec![vec!["he said \"hi\"", "x"]]
);

conformance!(
    embedded_newline_in_quoted_field,
    ParserConfig::default(),
    b"a,\"line1\nline2\"\nb,c\n",
    vec![vec!["a", "line1\nline2"], vec!["b", "c"]]
);

conformance!(
    no_trailing_newline,
    ParserConfig::default(),
    b"x,y,z",
    vec![vec!["x", "y", "z"]]
);

conformance!(
    custom_delimiter,
    ParserConfig::default().with_delimiter(b';'),
    b"a;b;c\n1;2;3\n",
    vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]
);

/// Large generated input, compared pairwise across all four entry points
/// rather than against a hand-written expectation. Needs many rows for the
/// parallel boundary-finder to actually split work across workers instead
/// of falling back to a single sequential chunk.
#[test]
fn many_rows_agree_across_entry_points() {
    let mut input = Vec::new();
    for i in 0..500 {
        input.extend_from_slice(format!("row{i},\"q,{i}\",plain\n").as_bytes());
    }
    let config = ParserConfig::default();

    let one_shot = via_one_shot(&config, &input);
    assert_eq!(one_shot.len(), 500);
    assert_eq!(via_lazy_iterator(&config, &input), one_shot);
    assert_eq!(via_parallel(&config, &input), one_shot);

    let mut sp = StreamingParser::new(config.clone());
    for chunk in input.chunks(97) {
        sp.feed(chunk).unwrap();
    }
    assert_eq!(strs(&sp.finalize().unwrap()), one_shot);
}
