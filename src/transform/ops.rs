//! Built-in transform implementations.
//!
//! Each function returns `None` when re-rendering its result would produce
//! the same bytes the field already had (e.g. `trim` on a field with no
//! surrounding whitespace, or `to_int` on a field already in canonical
//! decimal form), so [`super::pipeline::Pipeline::apply`] can report
//! `changed` accurately and avoid an allocation when nothing actually
//! changed.

use crate::error::Error;
use base64::Engine as _;
use sha2::{Digest, Sha256};

pub fn uppercase(input: &[u8]) -> Option<Vec<u8>> {
    let upper = input.to_ascii_uppercase();
    if upper == input {
        None
    } else {
        Some(upper)
    }
}

pub fn lowercase(input: &[u8]) -> Option<Vec<u8>> {
    let lower = input.to_ascii_lowercase();
    if lower == input {
        None
    } else {
        Some(lower)
    }
}

pub fn trim(input: &[u8]) -> Option<Vec<u8>> {
    let trimmed = crate::parser::field::trim_whitespace(input);
    if trimmed.len() == input.len() {
        None
    } else {
        Some(trimmed.to_vec())
    }
}

/// Prefix integer parse matching `cisv`'s `parse_int_branchless`: an
/// optional sign, then whitespace, then a digit run; the first non-digit
/// byte terminates the scan rather than rejecting the field. No digits
/// parses as 0.
fn parse_int_prefix(input: &[u8]) -> i64 {
    let mut i = 0;
    let neg = input.first() == Some(&b'-');
    if neg || input.first() == Some(&b'+') {
        i += 1;
    }
    while i < input.len() && (input[i] == b' ' || input[i] == b'\t') {
        i += 1;
    }
    let mut val: i64 = 0;
    while i < input.len() {
        let digit = input[i].wrapping_sub(b'0');
        if digit > 9 {
            break;
        }
        val = val.saturating_mul(10).saturating_add(digit as i64);
        i += 1;
    }
    if neg {
        -val
    } else {
        val
    }
}

pub fn to_int(input: &[u8]) -> Option<Vec<u8>> {
    let rendered = parse_int_prefix(input).to_string();
    if rendered.as_bytes() == input {
        None
    } else {
        Some(rendered.into_bytes())
    }
}

/// Prefix float parse matching `cisv`'s `strtod`-based `cisv_transform_to_float`:
/// takes the longest leading `[sign] digits [. digits] [e|E [sign] digits]`
/// run and parses only that, rather than rejecting on trailing garbage. No
/// valid prefix parses as 0.0.
fn parse_float_prefix(input: &[u8]) -> f64 {
    let len = input.len();
    let mut i = 0;
    while i < len && (input[i] == b' ' || input[i] == b'\t') {
        i += 1;
    }
    let start = i;
    if i < len && (input[i] == b'-' || input[i] == b'+') {
        i += 1;
    }
    let mut saw_digit = false;
    while i < len && input[i].is_ascii_digit() {
        i += 1;
        saw_digit = true;
    }
    if i < len && input[i] == b'.' {
        i += 1;
        while i < len && input[i].is_ascii_digit() {
            i += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return 0.0;
    }
    if i < len && (input[i] == b'e' || input[i] == b'E') {
        let mut j = i + 1;
        if j < len && (input[j] == b'-' || input[j] == b'+') {
            j += 1;
        }
        let exp_start = j;
        while j < len && input[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    std::str::from_utf8(&input[start..i])
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Six-digit fractional representation, matching `cisv`'s `"%.6f"` rendering.
pub fn to_float(input: &[u8]) -> Option<Vec<u8>> {
    let rendered = format!("{:.6}", parse_float_prefix(input));
    if rendered.as_bytes() == input {
        None
    } else {
        Some(rendered.into_bytes())
    }
}

pub fn base64_encode(input: &[u8]) -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .encode(input)
        .into_bytes()
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn hex_encode(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize]);
        out.push(HEX_DIGITS[(b & 0x0f) as usize]);
    }
    out
}

pub fn hash_sha256(input: &[u8]) -> Vec<u8> {
    let digest = Sha256::digest(input);
    hex_encode(&digest)
}

pub fn custom(f: &(dyn Fn(&[u8]) -> Vec<u8> + Send + Sync), input: &[u8]) -> Result<Vec<u8>, Error> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(input)))
        .map_err(|_| Error::Transform("custom transform panicked".to_string()))?;
    Ok(result)
}
