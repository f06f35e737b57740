//! Variable records (spec §3 "Variable").

use botc_util::Pos;

use crate::types::{DataType, Writability};

/// A constexpr variable's erased value: it never occupies a VM index, so
/// every use of its name is inlined as this value at the use site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstValue {
    Int(i64),
    /// Index into the string pool.
    StrIndex(u32),
    Bool(bool),
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    /// Empty for globals; the containing state's name for state-locals
    /// (spec §3: "global variables have empty owning-state; state-local
    /// variables carry the containing state's name").
    pub owning_state: String,
    pub ty: DataType,
    pub writability: Writability,
    pub is_array: bool,
    /// `None` for constexpr variables, `Some` for mutable/const ones.
    pub index: Option<u32>,
    pub origin: Pos,
    pub const_value: Option<ConstValue>,
}

impl Variable {
    pub fn is_global(&self) -> bool {
        self.owning_state.is_empty()
    }

    pub fn is_constexpr(&self) -> bool {
        self.writability == Writability::Constexpr
    }

    pub fn is_writable(&self) -> bool {
        self.writability == Writability::Mutable
    }
}
