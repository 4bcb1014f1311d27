//! Component E: transform pipeline.
//!
//! Field-level transforms run after parsing and before the writer, keyed by
//! column index or header name. The ownership sum type below belongs to
//! this layer only: the parser core emits owned field bytes, and it is the
//! pipeline's [`pipeline::Pipeline::apply`] result that may alias the input
//! row (`Borrowed`) or allocate (`Owned`) depending on whether a transform
//! actually changed the bytes.

pub mod ops;
pub mod pipeline;

pub use pipeline::Pipeline;

/// A field's value after passing through the pipeline: borrowed from the
/// input row when no transform touched it, owned when one did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl<'a> FieldValue<'a> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FieldValue::Borrowed(b) => b,
            FieldValue::Owned(v) => v,
        }
    }

    pub fn into_owned(self) -> Vec<u8> {
        match self {
            FieldValue::Borrowed(b) => b.to_vec(),
            FieldValue::Owned(v) => v,
        }
    }
}

/// One field's transform result: the resolved value, plus whether any
/// transform in the chain actually altered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult<'a> {
    pub value: FieldValue<'a>,
    pub changed: bool,
}

/// Which field(s) a transform applies to.
#[derive(Debug, Clone)]
pub enum Selector {
    Index(usize),
    Name(String),
    /// Applied to every field, before that field's index/name-selected
    /// transforms run.
    All,
}

/// A built-in or custom field transform.
#[derive(Clone)]
pub enum TransformOp {
    Uppercase,
    Lowercase,
    Trim,
    /// Scans a leading `[sign] digits` prefix, stopping at the first
    /// non-digit byte, and re-serialises whatever was parsed (0 if no
    /// digits matched) as a canonical base-10 integer. `changed` is false
    /// only when the field was already in that canonical form.
    ToInt,
    /// Scans a leading `[sign] digits [. digits] [exponent]` prefix,
    /// stopping at the first byte that doesn't fit, and re-serialises
    /// whatever was parsed (0.0 if no valid prefix) with six fractional
    /// digits. `changed` is false only when the field already matched that
    /// rendering exactly.
    ToFloat,
    Base64Encode,
    /// Lower-case hex-encoded SHA-256 digest of the field bytes.
    HashSha256,
    /// A caller-supplied transform. Failures are caught (the closure
    /// itself should not panic, but callers embedding this crate may pass
    /// one that does) and surfaced as `Error::Transform`, leaving the
    /// original bytes in place.
    Custom(std::sync::Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>),
}

impl std::fmt::Debug for TransformOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransformOp::Uppercase => "Uppercase",
            TransformOp::Lowercase => "Lowercase",
            TransformOp::Trim => "Trim",
            TransformOp::ToInt => "ToInt",
            TransformOp::ToFloat => "ToFloat",
            TransformOp::Base64Encode => "Base64Encode",
            TransformOp::HashSha256 => "HashSha256",
            TransformOp::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}
