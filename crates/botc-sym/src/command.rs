//! Command definitions (spec §3/§4.3 "Command definition").
//!
//! Populated once, early, from a definitions file (`botc_defs.bts`, parsed
//! by the same `botc-par` grammar used for real sources — spec §1 treats
//! the defs file as an external collaborator but its *syntax* is native
//! botscript, so it shares this table and the main parser).

use botc_util::{CompileError, CompileResult, ErrorKind, Pos};
use indexmap::IndexMap;

use crate::types::DataType;

#[derive(Clone, Debug)]
pub struct CommandArg {
    pub ty: DataType,
    pub name: String,
    pub default: Option<crate::variable::ConstValue>,
}

#[derive(Clone, Debug)]
pub struct CommandDef {
    pub opcode_number: u32,
    pub is_builtin: bool,
    pub name: String,
    pub return_type: DataType,
    pub args: Vec<CommandArg>,
    pub min_args: usize,
}

impl CommandDef {
    pub fn max_args(&self) -> usize {
        self.args.len()
    }
}

#[derive(Default, Debug)]
pub struct CommandTable {
    /// Keyed by lowercased name for case-insensitive lookup (spec §4.3).
    by_name: IndexMap<String, CommandDef>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: CommandDef, pos: &Pos) -> CompileResult<()> {
        let key = def.name.to_ascii_lowercase();
        if let Some(existing) = self.by_name.get(&key) {
            if existing.opcode_number == def.opcode_number && existing.is_builtin == def.is_builtin {
                return Err(CompileError::at(
                    ErrorKind::Parse,
                    pos.clone(),
                    format!(
                        "command `{}` redefined with the same opcode {} (is_builtin={})",
                        def.name, def.opcode_number, def.is_builtin
                    ),
                ));
            }
        }
        self.by_name.insert(key, def);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandDef> {
        self.by_name.get(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDef> {
        self.by_name.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_util::{file_name, Pos};

    fn pos() -> Pos {
        Pos::new(file_name("t.bts"), 1, 1)
    }

    fn def(name: &str, opcode: u32, is_builtin: bool) -> CommandDef {
        CommandDef {
            opcode_number: opcode,
            is_builtin,
            name: name.to_string(),
            return_type: DataType::Void,
            args: vec![],
            min_args: 0,
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut t = CommandTable::new();
        t.define(def("Log", 7, true), &pos()).unwrap();
        assert!(t.lookup("log").is_some());
        assert!(t.lookup("LOG").is_some());
    }

    #[test]
    fn redefinition_with_same_opcode_and_flag_is_an_error() {
        let mut t = CommandTable::new();
        t.define(def("log", 7, true), &pos()).unwrap();
        assert!(t.define(def("log", 7, true), &pos()).is_err());
    }
}
