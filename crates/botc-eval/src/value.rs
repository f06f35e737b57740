//! The expression evaluator's intermediate representations (spec §3/§4.5).

use botc_buf::DataBuffer;
use botc_isa::{Arity, OperatorDef};
use botc_sym::DataType;

/// A fully-reduced operand: either known at compile time (an integer,
/// possibly standing in for a `bool`, or a string-pool index) or already
/// lowered to code that leaves its result on the VM stack.
///
/// Exactly the three shapes spec §3 gives "value": constexpr integer,
/// constexpr string index, or a data buffer that computes it.
#[derive(Clone, Debug)]
pub enum Val {
    Int(i64),
    Str(u32),
    Buf(DataBuffer),
}

impl Val {
    pub fn ty(&self, is_bool: bool) -> DataType {
        match self {
            Val::Int(_) if is_bool => DataType::Bool,
            Val::Int(_) => DataType::Int,
            Val::Str(_) => DataType::Str,
            Val::Buf(_) => DataType::Void, // caller tracks the real type separately
        }
    }

    pub fn as_const_int(&self) -> Option<i64> {
        match self {
            Val::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        !matches!(self, Val::Buf(_))
    }
}

/// One slot in the flat expression vector (spec §4.5 "Expression symbol").
///
/// The ternary never appears here: `?:` is handled structurally by
/// `evaluate` itself (its branches are independent recursive sub-parses,
/// not flat-list neighbors), so this vector only ever holds unary/binary
/// operators and values.
#[derive(Clone, Debug)]
pub enum Sym {
    /// A reduced operand plus the declared type it was parsed against,
    /// needed so a later reduction step can reject e.g. `"hi" + 1`.
    Value { val: Val, ty: DataType },
    Operator(OperatorDef),
}

impl Sym {
    pub fn value(val: Val, ty: DataType) -> Self {
        Sym::Value { val, ty }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Sym::Value { .. })
    }

    pub fn as_operator(&self) -> Option<&OperatorDef> {
        match self {
            Sym::Operator(o) => Some(o),
            _ => None,
        }
    }

    pub fn arity(&self) -> Option<Arity> {
        self.as_operator().map(|o| o.arity)
    }
}
