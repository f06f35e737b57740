//! botc-isa — the wire-format vocabulary shared by every compiler stage.
//!
//! This crate has no logic of its own beyond table lookups: the bytecode
//! [`Opcode`] enum, the operator-priority table that `botc-eval` reduces
//! over, and the resource [`limits`] that `botc-sym`/`botc-par` enforce.
//! Keeping it dependency-free and separate from `botc-buf`/`botc-par` means
//! those crates (and any future VM-side crate written against the same
//! wire format) can share exactly one definition of "what an opcode is"
//! without pulling in the parser.

pub mod limits;
pub mod opcode;
pub mod operator;

pub use opcode::Opcode;
pub use operator::{lookup_binary, lookup_unary, Arity, OperatorDef, OPERATORS, TERNARY_PRIORITY};
