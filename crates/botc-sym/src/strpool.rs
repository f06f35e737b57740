//! The string literal pool (spec §3/§4.3 "String pool").
//!
//! Ordered, deduplicated by content, capacity 128 entries of at most 256
//! bytes each. `intern` is the only way in; the returned index is stable
//! for the rest of the compile and is what `PushStringIndex` and
//! `StateName` operands carry on the wire.

use botc_isa::limits;
use botc_util::{CompileError, CompileResult, ErrorKind, Pos};
use indexmap::IndexSet;

#[derive(Default, Debug)]
pub struct StringPool {
    entries: IndexSet<String>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing index if `s` was already interned, else
    /// appends it and returns the new index (spec §3: "`intern(s)` returns
    /// the existing index if present, else appends and returns the new
    /// index").
    pub fn intern(&mut self, s: &str, pos: &Pos) -> CompileResult<u32> {
        if let Some(idx) = self.entries.get_index_of(s) {
            return Ok(idx as u32);
        }
        if s.len() > limits::MAX_STRING_LEN {
            return Err(CompileError::at(
                ErrorKind::Limit,
                pos.clone(),
                format!(
                    "string literal exceeds {} bytes ({} bytes)",
                    limits::MAX_STRING_LEN,
                    s.len()
                ),
            ));
        }
        if self.entries.len() >= limits::MAX_STRING_POOL_ENTRIES {
            return Err(CompileError::at(
                ErrorKind::Limit,
                pos.clone(),
                format!("more than {} distinct string literals", limits::MAX_STRING_POOL_ENTRIES),
            ));
        }
        let (idx, _) = self.entries.insert_full(s.to_string());
        Ok(idx as u32)
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.entries.get_index(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordinal first-insertion order, as required by spec's invariant 6.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_util::{file_name, Pos};

    fn dummy_pos() -> Pos {
        Pos::new(file_name("t.bts"), 1, 1)
    }

    #[test]
    fn interning_is_stable_and_deduplicated() {
        let mut pool = StringPool::new();
        let a = pool.intern("foo", &dummy_pos()).unwrap();
        let b = pool.intern("bar", &dummy_pos()).unwrap();
        let a2 = pool.intern("foo", &dummy_pos()).unwrap();
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec!["foo", "bar"]);
    }

    #[test]
    fn rejects_overlong_strings() {
        let mut pool = StringPool::new();
        let huge = "x".repeat(300);
        assert!(pool.intern(&huge, &dummy_pos()).is_err());
    }

    #[test]
    fn rejects_too_many_entries() {
        let mut pool = StringPool::new();
        for i in 0..botc_isa::limits::MAX_STRING_POOL_ENTRIES {
            pool.intern(&format!("s{i}"), &dummy_pos()).unwrap();
        }
        assert!(pool.intern("overflow", &dummy_pos()).is_err());
    }
}
