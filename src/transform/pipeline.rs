//! Header-name resolution and the transform pipeline itself.

use super::{ops, FieldValue, Selector, TransformOp, TransformResult};
use crate::error::Error;
use zeroize::Zeroizing;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Open-addressed header-name → field-index table, sized to the next power
/// of two at least twice the header count to keep probe chains short.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    slots: Vec<Option<(String, usize)>>,
    len: usize,
}

impl HeaderMap {
    pub fn new(names: &[String]) -> Self {
        let capacity = (names.len().max(1) * 2).next_power_of_two();
        let mut map = HeaderMap {
            slots: vec![None; capacity],
            len: 0,
        };
        for (i, name) in names.iter().enumerate() {
            map.insert(name.clone(), i);
        }
        map
    }

    fn insert(&mut self, name: String, index: usize) {
        let mask = (self.slots.len() - 1) as u64;
        let mut probe = fnv1a(name.as_bytes()) & mask;
        loop {
            match &self.slots[probe as usize] {
                None => {
                    self.slots[probe as usize] = Some((name, index));
                    self.len += 1;
                    return;
                }
                Some((existing, _)) if *existing == name => {
                    self.slots[probe as usize] = Some((name, index));
                    return;
                }
                Some(_) => {
                    probe = (probe + 1) & mask;
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let mask = (self.slots.len() - 1) as u64;
        let mut probe = fnv1a(name.as_bytes()) & mask;
        for _ in 0..self.slots.len() {
            match &self.slots[probe as usize] {
                None => return None,
                Some((existing, index)) if existing == name => return Some(*index),
                Some(_) => probe = (probe + 1) & mask,
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Per-field and global transform chains. Rebuilt lazily: name-keyed
/// registrations are re-resolved to field indices against whichever header
/// is in effect the next time [`Pipeline::apply`] runs (`set_header` can
/// replace the header after registration; `Pipeline::add_by_name` only
/// checks the name at registration time).
#[derive(Default)]
struct FieldIndex {
    by_index: Vec<(usize, TransformOp)>,
    by_name: Vec<(String, TransformOp)>,
    global: Vec<TransformOp>,
    resolved: Vec<Vec<TransformOp>>,
    dirty: bool,
}

impl FieldIndex {
    fn push(&mut self, selector: Selector, op: TransformOp) {
        match selector {
            Selector::Index(i) => self.by_index.push((i, op)),
            Selector::Name(n) => self.by_name.push((n, op)),
            Selector::All => self.global.push(op),
        }
        self.dirty = true;
    }

    /// Global transforms run first, then the index/name-selected ones, each
    /// group in its own insertion order.
    fn resolve(&mut self, header: Option<&HeaderMap>, field_count: usize) {
        if !self.dirty && self.resolved.len() == field_count {
            return;
        }
        self.resolved = vec![self.global.clone(); field_count];
        for (index, op) in &self.by_index {
            if let Some(slot) = self.resolved.get_mut(*index) {
                slot.push(op.clone());
            }
        }
        if let Some(header) = header {
            for (name, op) in &self.by_name {
                if let Some(index) = header.get(name) {
                    if let Some(slot) = self.resolved.get_mut(index) {
                        slot.push(op.clone());
                    }
                }
            }
        }
        self.dirty = false;
    }
}

/// Runs a configured chain of field transforms over each parsed row.
///
/// Owns no parser or writer state; constructed once per logical stream and
/// reused across rows. `context_secret`, when set, holds key/IV-style
/// material a `Custom` transform closure was built to use (the pipeline
/// itself never reads it) and is zeroed on drop rather than left to linger
/// in freed memory.
pub struct Pipeline {
    header: Option<HeaderMap>,
    index: FieldIndex,
    context_secret: Option<Zeroizing<Vec<u8>>>,
}

impl Pipeline {
    /// `initial_capacity` pre-sizes the per-selector registration lists
    /// (index, name, and global chains); it is a hint, not a hard cap —
    /// `add`/`add_by_name` grow past it like any `Vec`.
    pub fn new(initial_capacity: usize) -> Self {
        Pipeline {
            header: None,
            index: FieldIndex {
                by_index: Vec::with_capacity(initial_capacity),
                by_name: Vec::with_capacity(initial_capacity),
                global: Vec::new(),
                resolved: Vec::new(),
                dirty: false,
            },
            context_secret: None,
        }
    }

    /// Register a header row so later `add_by_name` selectors resolve to
    /// field indices.
    pub fn set_header(&mut self, names: &[String]) {
        self.header = Some(HeaderMap::new(names));
        self.index.dirty = true;
    }

    /// Add a transform by field index or `Selector::All`.
    pub fn add(&mut self, selector: Selector, op: TransformOp) {
        self.index.push(selector, op);
    }

    /// Add a transform by header name, resolved against the header already
    /// registered via [`Self::set_header`]. Fails if no header is set or
    /// `name` isn't one of its columns.
    pub fn add_by_name(&mut self, name: impl Into<String>, op: TransformOp) -> Result<(), Error> {
        let name = name.into();
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| Error::Transform(format!("add_by_name(\"{name}\"): no header set")))?;
        if header.get(&name).is_none() {
            return Err(Error::Transform(format!(
                "add_by_name(\"{name}\"): not a column in the current header"
            )));
        }
        self.index.push(Selector::Name(name), op);
        Ok(())
    }

    /// Attach key/IV-style material for a `Custom` transform to use. Zeroed
    /// on drop.
    pub fn set_context_secret(&mut self, secret: Vec<u8>) {
        self.context_secret = Some(Zeroizing::new(secret));
    }

    pub fn context_secret(&self) -> Option<&[u8]> {
        self.context_secret.as_deref().map(Vec::as_slice)
    }

    /// Run every configured transform over `row`, in index-then-global
    /// order per field.
    pub fn apply<'a>(&mut self, row: &'a [Vec<u8>]) -> Result<Vec<TransformResult<'a>>, Error> {
        self.index.resolve(self.header.as_ref(), row.len());

        let mut out = Vec::with_capacity(row.len());
        for (i, field) in row.iter().enumerate() {
            let chain = self.index.resolved.get(i).map(|v| v.as_slice()).unwrap_or(&[]);
            let mut changed = false;
            let mut current: Option<Vec<u8>> = None;

            for op in chain {
                let input: &[u8] = current.as_deref().unwrap_or(field);
                match op {
                    TransformOp::Uppercase => {
                        if let Some(next) = ops::uppercase(input) {
                            current = Some(next);
                            changed = true;
                        }
                    }
                    TransformOp::Lowercase => {
                        if let Some(next) = ops::lowercase(input) {
                            current = Some(next);
                            changed = true;
                        }
                    }
                    TransformOp::Trim => {
                        if let Some(next) = ops::trim(input) {
                            current = Some(next);
                            changed = true;
                        }
                    }
                    TransformOp::ToInt => {
                        if let Some(next) = ops::to_int(input) {
                            current = Some(next);
                            changed = true;
                        }
                    }
                    TransformOp::ToFloat => {
                        if let Some(next) = ops::to_float(input) {
                            current = Some(next);
                            changed = true;
                        }
                    }
                    TransformOp::Base64Encode => {
                        current = Some(ops::base64_encode(input));
                        changed = true;
                    }
                    TransformOp::HashSha256 => {
                        current = Some(ops::hash_sha256(input));
                        changed = true;
                    }
                    TransformOp::Custom(f) => {
                        current = Some(ops::custom(f.as_ref(), input)?);
                        changed = true;
                    }
                }
            }

            let value = match current {
                Some(bytes) => FieldValue::Owned(bytes),
                None => FieldValue::Borrowed(field),
            };
            out.push(TransformResult { value, changed });
        }
        Ok(out)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(0)
    }
}
