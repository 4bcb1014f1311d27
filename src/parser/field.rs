//! Field decoding helpers shared by the parser core and the transform
//! pipeline's `trim` op.

/// Strip leading/trailing space and tab bytes. Matches §4.C's
/// locale-independent whitespace definition (space, tab only — not the
/// full Unicode whitespace set, since the parser operates on raw bytes).
#[inline]
pub fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let is_ws = |b: &u8| *b == b' ' || *b == b'\t';
    let start = bytes.iter().position(|b| !is_ws(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_ws(b)).map_or(start, |p| p + 1);
    &bytes[start..end]
}
