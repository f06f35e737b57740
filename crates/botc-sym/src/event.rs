//! Event definitions (spec §3/§4.3 "Event definition").

use botc_isa::limits;
use botc_util::{CompileError, CompileResult, ErrorKind, Pos};
use indexmap::IndexMap;

#[derive(Clone, Debug)]
pub struct EventDef {
    /// Assigned from the source file, not auto-incremented (spec §4.3).
    pub number: u32,
    pub name: String,
}

#[derive(Default, Debug)]
pub struct EventTable {
    by_name: IndexMap<String, EventDef>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// spec §6: "32 global events" — enforced against the definitions-file
    /// table, not the per-state reference count `botc-par` tracks
    /// separately.
    pub fn define(&mut self, def: EventDef, pos: &Pos) -> CompileResult<()> {
        if !self.by_name.contains_key(&def.name.to_ascii_lowercase()) && self.by_name.len() >= limits::MAX_GLOBAL_EVENTS {
            return Err(CompileError::at(
                ErrorKind::Limit,
                pos.clone(),
                format!("more than {} global events", limits::MAX_GLOBAL_EVENTS),
            ));
        }
        self.by_name.insert(def.name.to_ascii_lowercase(), def);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&EventDef> {
        self.by_name.get(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventDef> {
        self.by_name.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_util::file_name;

    fn dummy_pos() -> Pos {
        Pos::new(file_name("defs.bts"), 1, 1)
    }

    #[test]
    fn redefining_the_same_name_does_not_count_against_the_limit() {
        let mut events = EventTable::new();
        for i in 0..limits::MAX_GLOBAL_EVENTS {
            events.define(EventDef { number: i as u32, name: "onTick".into() }, &dummy_pos()).unwrap();
        }
        assert_eq!(events.iter().count(), 1);
    }

    #[test]
    fn rejects_too_many_distinct_events() {
        let mut events = EventTable::new();
        for i in 0..limits::MAX_GLOBAL_EVENTS {
            events.define(EventDef { number: i as u32, name: format!("ev{i}") }, &dummy_pos()).unwrap();
        }
        assert!(events.define(EventDef { number: 99, name: "overflow".into() }, &dummy_pos()).is_err());
    }
}
