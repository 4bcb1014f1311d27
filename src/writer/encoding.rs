//! Supplemented feature: output character encoding.
//!
//! Ported from the teacher's `strategy/encoding.rs`. The writer's input is
//! always UTF-8 (it operates on the same byte fields the parser produced);
//! this module re-encodes the already-quoted/escaped bytes into the
//! configured target encoding immediately before they reach the sink.

/// Output character encoding applied by [`super::Writer`] after quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingTarget {
    #[default]
    Utf8,
    Latin1,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

/// Re-encode `input` (valid UTF-8) into `target`, appending the result to
/// `out` without an intermediate allocation.
pub fn encode_utf8_extend(input: &[u8], target: EncodingTarget, out: &mut Vec<u8>) {
    match target {
        EncodingTarget::Utf8 => out.extend_from_slice(input),
        EncodingTarget::Latin1 => utf8_to_latin1_extend(input, out),
        EncodingTarget::Utf16Le => utf8_to_utf16_extend(input, true, out),
        EncodingTarget::Utf16Be => utf8_to_utf16_extend(input, false, out),
        EncodingTarget::Utf32Le => utf8_to_utf32_extend(input, true, out),
        EncodingTarget::Utf32Be => utf8_to_utf32_extend(input, false, out),
    }
}

/// Lossy: code points above `U+00FF` are replaced with `?` (0x3F), matching
/// the teacher's behaviour for this strategy.
fn utf8_to_latin1_extend(input: &[u8], out: &mut Vec<u8>) {
    for ch in String::from_utf8_lossy(input).chars() {
        if (ch as u32) <= 0xFF {
            out.push(ch as u8);
        } else {
            out.push(b'?');
        }
    }
}

fn utf8_to_utf16_extend(input: &[u8], little_endian: bool, out: &mut Vec<u8>) {
    let mut buf = [0u16; 2];
    for ch in String::from_utf8_lossy(input).chars() {
        for unit in ch.encode_utf16(&mut buf) {
            if little_endian {
                out.extend_from_slice(&unit.to_le_bytes());
            } else {
                out.extend_from_slice(&unit.to_be_bytes());
            }
        }
    }
}

fn utf8_to_utf32_extend(input: &[u8], little_endian: bool, out: &mut Vec<u8>) {
    for ch in String::from_utf8_lossy(input).chars() {
        let cp = ch as u32;
        if little_endian {
            out.extend_from_slice(&cp.to_le_bytes());
        } else {
            out.extend_from_slice(&cp.to_be_bytes());
        }
    }
}
