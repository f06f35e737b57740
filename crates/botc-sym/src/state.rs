//! State registry (spec §3/§4.3 "State").
//!
//! Two-phase: a forward declaration (`state NAME;`) registers the name
//! without marking it defined; an actual `state NAME { … }` block must not
//! re-define an already-defined name. `statespawn` (case-insensitive) is
//! mandatory and its absence is caught only at end-of-compile, since a
//! forward declaration elsewhere in the file could still satisfy it.

use botc_isa::limits;
use botc_util::{CompileError, CompileResult, ErrorKind, Pos};
use indexmap::IndexMap;

#[derive(Clone, Debug)]
pub struct StateEntry {
    pub name: String,
    pub is_declared: bool,
    pub index: u32,
}

#[derive(Default, Debug)]
pub struct StateTable {
    by_name: IndexMap<String, StateEntry>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` if unseen, returning its (possibly new) index.
    /// Used both for forward declarations and for the first mention of a
    /// state inside an `event`/statement that references it.
    pub fn forward_declare(&mut self, name: &str, pos: &Pos) -> CompileResult<u32> {
        let key = name.to_ascii_lowercase();
        if let Some(entry) = self.by_name.get(&key) {
            return Ok(entry.index);
        }
        if self.by_name.len() >= limits::MAX_STATES {
            return Err(CompileError::at(
                ErrorKind::Limit,
                pos.clone(),
                format!("more than {} states", limits::MAX_STATES),
            ));
        }
        let index = self.by_name.len() as u32;
        self.by_name.insert(key, StateEntry { name: name.to_string(), is_declared: false, index });
        Ok(index)
    }

    /// Marks `name` as defined by an actual `state NAME { … }` block.
    /// Errors if it was already defined (spec §4.3: "an actual state block
    /// must not re-define an already-defined name").
    pub fn define(&mut self, name: &str, pos: &Pos) -> CompileResult<u32> {
        let index = self.forward_declare(name, pos)?;
        let key = name.to_ascii_lowercase();
        let entry = self.by_name.get_mut(&key).expect("just inserted");
        if entry.is_declared {
            return Err(CompileError::at(
                ErrorKind::Parse,
                pos.clone(),
                format!("state `{name}` is already defined"),
            ));
        }
        entry.is_declared = true;
        Ok(index)
    }

    pub fn lookup(&self, name: &str) -> Option<&StateEntry> {
        self.by_name.get(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateEntry> {
        self.by_name.values()
    }

    /// spec §4.3: absence of `statespawn` is a fatal end-of-compile error.
    pub fn check_spawn_state_defined(&self) -> CompileResult<()> {
        match self.by_name.get(limits::SPAWN_STATE_NAME) {
            Some(entry) if entry.is_declared => Ok(()),
            _ => Err(CompileError::new(
                ErrorKind::Parse,
                format!("no state named `{}` was defined", limits::SPAWN_STATE_NAME),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_util::file_name;

    fn pos() -> Pos {
        Pos::new(file_name("t.bts"), 1, 1)
    }

    #[test]
    fn forward_declare_then_define_reuses_index() {
        let mut t = StateTable::new();
        let idx1 = t.forward_declare("foo", &pos()).unwrap();
        let idx2 = t.define("foo", &pos()).unwrap();
        assert_eq!(idx1, idx2);
    }

    #[test]
    fn redefining_a_defined_state_is_an_error() {
        let mut t = StateTable::new();
        t.define("foo", &pos()).unwrap();
        assert!(t.define("foo", &pos()).is_err());
    }

    #[test]
    fn missing_statespawn_fails_at_end_of_compile() {
        let mut t = StateTable::new();
        t.define("other", &pos()).unwrap();
        assert!(t.check_spawn_state_defined().is_err());
    }

    #[test]
    fn statespawn_lookup_is_case_insensitive() {
        let mut t = StateTable::new();
        t.define("StateSpawn", &pos()).unwrap();
        assert!(t.check_spawn_state_defined().is_ok());
    }
}
