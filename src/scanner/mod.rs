//! Component B: chunk scanner.
//!
//! Produces the byte-positions of every structurally significant byte in a
//! slice, vectorised at the widest ISA width the build supports, with a
//! scalar fallback for the tail. Per the design note on SIMD as a
//! compile-time capability, this is a trait with one implementation per
//! ISA width rather than `#ifdef`-style branches threaded through the
//! parser core.

use crate::classifier::Classifier;
use std::simd::prelude::*;

/// Baseline vector width: available on every target `std::simd` supports,
/// and used as the portable stand-in for the spec's "16 on NEON" path.
pub const CHUNK: usize = 16;

#[cfg(target_feature = "avx2")]
pub const WIDE: usize = 32;

#[cfg(target_feature = "avx512f")]
pub const WIDE64: usize = 64;

/// What the scanner is looking for, per the mode-dependent contract in
/// SPEC_FULL.md §4.B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Delimiter, quote, or LF are all structurally significant.
    InField,
    /// Only quote is structurally significant.
    InQuotedField,
}

/// A chunk scanner: given a byte slice and a mode, appends the absolute
/// positions of every structurally significant byte to `out`, in ascending
/// order. The union of positions must be exact: every structurally
/// significant byte present, and no other byte included.
pub trait Scanner: Send + Sync {
    /// Vector width this implementation processes per iteration. Used only
    /// for diagnostics/tests; callers should not branch on it.
    fn width(&self) -> usize;

    fn scan(&self, chunk: &[u8], classifier: &Classifier, mode: ScanMode, out: &mut Vec<usize>);
}

/// Pick the widest scanner compiled in for this build. Logged at `debug`
/// level since it's easy to misdiagnose a performance regression caused by
/// a build that silently fell back to the scalar path.
pub fn best_available() -> Box<dyn Scanner> {
    #[cfg(target_feature = "avx512f")]
    {
        log::debug!("chunk scanner: selected AVX-512 (64-byte) path");
        return Box::new(Avx512Scanner);
    }
    #[cfg(all(target_feature = "avx2", not(target_feature = "avx512f")))]
    {
        log::debug!("chunk scanner: selected AVX2 (32-byte) path");
        return Box::new(Avx2Scanner);
    }
    #[cfg(not(any(target_feature = "avx2", target_feature = "avx512f")))]
    {
        log::debug!("chunk scanner: selected baseline SIMD (16-byte) path");
        return Box::new(BaselineScanner);
    }
}

#[inline]
fn is_structural_scalar(byte: u8, classifier: &Classifier, mode: ScanMode) -> bool {
    match mode {
        ScanMode::InField => classifier.is_structural_in_field(byte),
        ScanMode::InQuotedField => classifier.is_quote(byte),
    }
}

/// Scalar fallback, always correct, used for tails shorter than one vector
/// and as the sole implementation when no wider path is compiled in.
pub struct ScalarScanner;

impl Scanner for ScalarScanner {
    fn width(&self) -> usize {
        1
    }

    fn scan(&self, chunk: &[u8], classifier: &Classifier, mode: ScanMode, out: &mut Vec<usize>) {
        for (i, &b) in chunk.iter().enumerate() {
            if is_structural_scalar(b, classifier, mode) {
                out.push(i);
            }
        }
    }
}

/// Extract set-bit positions from a bitmask, offsetting by `base`.
#[inline]
fn emit_bits(mut mask: u64, base: usize, out: &mut Vec<usize>) {
    while mask != 0 {
        let bit = mask.trailing_zeros() as usize;
        out.push(base + bit);
        mask &= mask - 1;
    }
}

/// 16-byte baseline vector scanner, built on `std::simd` so it compiles
/// (functionally, if not always optimally) on every target.
pub struct BaselineScanner;

impl Scanner for BaselineScanner {
    fn width(&self) -> usize {
        CHUNK
    }

    fn scan(&self, chunk: &[u8], classifier: &Classifier, mode: ScanMode, out: &mut Vec<usize>) {
        scan_simd_width::<CHUNK>(chunk, classifier, mode, out);
    }
}

#[cfg(target_feature = "avx2")]
pub struct Avx2Scanner;

#[cfg(target_feature = "avx2")]
impl Scanner for Avx2Scanner {
    fn width(&self) -> usize {
        WIDE
    }

    fn scan(&self, chunk: &[u8], classifier: &Classifier, mode: ScanMode, out: &mut Vec<usize>) {
        scan_simd_width::<WIDE>(chunk, classifier, mode, out);
    }
}

#[cfg(target_feature = "avx512f")]
pub struct Avx512Scanner;

#[cfg(target_feature = "avx512f")]
impl Scanner for Avx512Scanner {
    fn width(&self) -> usize {
        WIDE64
    }

    fn scan(&self, chunk: &[u8], classifier: &Classifier, mode: ScanMode, out: &mut Vec<usize>) {
        scan_simd_width::<WIDE64>(chunk, classifier, mode, out);
    }
}

/// Shared vectorised scan, monomorphised per width. Compares the chunk
/// against broadcast registers for each structurally significant byte
/// value (direct byte-equality, per §4.A — the classifier table itself is
/// only consulted on the scalar tail) and folds the hits into a bitmask
/// per `LANES`-sized window, then extracts set-bit positions.
fn scan_simd_width<const LANES: usize>(
    chunk: &[u8],
    classifier: &Classifier,
    mode: ScanMode,
    out: &mut Vec<usize>,
) {
    let len = chunk.len();
    let mut pos = 0;

    let quote_splat = Simd::<u8, LANES>::splat(classifier.quote());
    let (delim_splat, lf_splat) = match mode {
        ScanMode::InField => (
            Some(Simd::<u8, LANES>::splat(classifier.delimiter())),
            Some(Simd::<u8, LANES>::splat(b'\n')),
        ),
        ScanMode::InQuotedField => (None, None),
    };

    while pos + LANES <= len {
        let v = Simd::<u8, LANES>::from_slice(&chunk[pos..pos + LANES]);
        let mut hits = v.simd_eq(quote_splat);
        if let Some(d) = delim_splat {
            hits |= v.simd_eq(d);
        }
        if let Some(l) = lf_splat {
            hits |= v.simd_eq(l);
        }
        let bits = hits.to_bitmask() as u64;
        emit_bits(bits, pos, out);
        pos += LANES;
    }

    // Scalar tail.
    while pos < len {
        if is_structural_scalar(chunk[pos], classifier, mode) {
            out.push(pos);
        }
        pos += 1;
    }
}
