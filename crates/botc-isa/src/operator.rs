//! Operator priority table (spec §4.5).
//!
//! Lower `priority` binds tighter. `botc-eval`'s reducer repeatedly looks
//! for the symbol with the lowest `priority` in the flat expression vector
//! and splices it with its operands; this table is the single source of
//! truth for both the lexical spelling → operator mapping and the
//! resulting VM opcode.

use crate::opcode::Opcode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
    /// `? :`, synthesized as a branch skeleton rather than a single opcode.
    Ternary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperatorDef {
    pub lexeme: &'static str,
    pub priority: u32,
    pub arity: Arity,
    /// `None` for the ternary, which has no single VM header.
    pub opcode: Option<Opcode>,
}

/// All binary/unary operators in priority order, lowest number binds
/// tightest. The ternary is listed last with the lowest binding priority,
/// matching spec §4.5's table.
pub const OPERATORS: &[OperatorDef] = &[
    OperatorDef { lexeme: "!", priority: 0, arity: Arity::Unary, opcode: Some(Opcode::NegateLogical) },
    OperatorDef { lexeme: "neg", priority: 0, arity: Arity::Unary, opcode: Some(Opcode::UnaryMinus) },
    OperatorDef { lexeme: "*", priority: 10, arity: Arity::Binary, opcode: Some(Opcode::Multiply) },
    OperatorDef { lexeme: "/", priority: 10, arity: Arity::Binary, opcode: Some(Opcode::Divide) },
    OperatorDef { lexeme: "%", priority: 10, arity: Arity::Binary, opcode: Some(Opcode::Modulus) },
    OperatorDef { lexeme: "+", priority: 20, arity: Arity::Binary, opcode: Some(Opcode::Add) },
    OperatorDef { lexeme: "-", priority: 20, arity: Arity::Binary, opcode: Some(Opcode::Subtract) },
    OperatorDef { lexeme: "<<", priority: 30, arity: Arity::Binary, opcode: Some(Opcode::LeftShift) },
    OperatorDef { lexeme: ">>", priority: 30, arity: Arity::Binary, opcode: Some(Opcode::RightShift) },
    OperatorDef { lexeme: "<", priority: 40, arity: Arity::Binary, opcode: Some(Opcode::LessThan) },
    OperatorDef { lexeme: ">", priority: 40, arity: Arity::Binary, opcode: Some(Opcode::GreaterThan) },
    OperatorDef { lexeme: ">=", priority: 40, arity: Arity::Binary, opcode: Some(Opcode::AtLeast) },
    OperatorDef { lexeme: "<=", priority: 40, arity: Arity::Binary, opcode: Some(Opcode::AtMost) },
    OperatorDef { lexeme: "==", priority: 50, arity: Arity::Binary, opcode: Some(Opcode::Equals) },
    OperatorDef { lexeme: "!=", priority: 50, arity: Arity::Binary, opcode: Some(Opcode::NotEquals) },
    OperatorDef { lexeme: "&", priority: 60, arity: Arity::Binary, opcode: Some(Opcode::AndBitwise) },
    OperatorDef { lexeme: "^", priority: 70, arity: Arity::Binary, opcode: Some(Opcode::EorBitwise) },
    OperatorDef { lexeme: "|", priority: 80, arity: Arity::Binary, opcode: Some(Opcode::OrBitwise) },
    OperatorDef { lexeme: "&&", priority: 90, arity: Arity::Binary, opcode: Some(Opcode::AndLogical) },
    OperatorDef { lexeme: "||", priority: 100, arity: Arity::Binary, opcode: Some(Opcode::OrLogical) },
    OperatorDef { lexeme: "?:", priority: 110, arity: Arity::Ternary, opcode: None },
];

/// Finds the binary/unary operator definition for a lexeme, preferring the
/// binary reading (`-` defaults to `Subtract`; the evaluator's fixup pass
/// retags leading/pre-value `-` to `UnaryMinus` explicitly — see spec
/// §4.5 "Fixup pass").
pub fn lookup_binary(lexeme: &str) -> Option<OperatorDef> {
    OPERATORS.iter().copied().find(|o| o.lexeme == lexeme && o.arity != Arity::Unary)
}

pub fn lookup_unary(lexeme: &str) -> Option<OperatorDef> {
    match lexeme {
        "!" => OPERATORS.iter().copied().find(|o| o.lexeme == "!"),
        "-" => OPERATORS.iter().copied().find(|o| o.lexeme == "neg"),
        _ => None,
    }
}

pub const TERNARY_PRIORITY: u32 = 110;
