//! botc-eval — the expression evaluator (spec §3/§4.5, component C5).
//!
//! Builds a flat vector of [`value::Sym`]s for one expression, rewrites
//! leading/pre-value unary minus to binary subtract, validates operand
//! shape, then repeatedly reduces the lowest-priority operator left in the
//! vector until one value remains. Constant operands fold away at compile
//! time with two's-complement semantics; anything else gets lowered into a
//! [`DataBuffer`] that computes it at runtime. The ternary is the one
//! construct that never gets a single opcode — non-constant conditions
//! lower to an if/goto skeleton, constant ones take the matching branch
//! and drop the other entirely.

pub mod value;

use botc_buf::DataBuffer;
use botc_isa::{lookup_binary, lookup_unary, Arity, Opcode, OperatorDef};
use botc_lex::{TokenKind, TokenStream};
use botc_sym::{CommandTable, ConstValue, DataType, StringPool, Variable};
use botc_util::{CompileError, CompileResult, ErrorKind, Pos};

pub use value::{Sym, Val};

/// Supplies variable lookups to the evaluator without exposing the
/// parser's scope-stack machinery. `botc-par`'s scope stack implements
/// this directly against its live frames.
pub trait VarLookup {
    fn lookup(&self, name: &str) -> Option<&Variable>;
}

pub struct EvalCtx<'a> {
    pub strings: &'a mut StringPool,
    pub commands: &'a CommandTable,
    pub vars: &'a dyn VarLookup,
}

/// Parses and reduces one expression, requiring its final type be
/// compatible with `expected` (spec §3: "bool is int-shaped" is the only
/// coercion; everything else must match exactly).
pub fn evaluate(stream: &mut TokenStream, expected: DataType, ctx: &mut EvalCtx) -> CompileResult<Val> {
    evaluate_typed(stream, expected, ctx).map(|(val, _)| val)
}

/// `?:` has the loosest binding of anything in the grammar and its branches
/// are themselves full expressions, so it sits outside the flat-vector
/// reducer: parse the condition as an ordinary operator chain, and if a
/// `?` follows, recurse for each branch. Recursing for the false branch is
/// what gives chained ternaries their right-associativity for free.
///
/// A condition is never itself a string, but the expression as a whole
/// might be one (`cond ? "a" : "b"`); when `expected` is `Str` we can't
/// know which case we're in until we've seen whether a `?` follows, so we
/// speculatively parse the leading chain as `Int` first and fall back to
/// re-parsing it as `Str` if that guess was wrong.
fn evaluate_typed(stream: &mut TokenStream, expected: DataType, ctx: &mut EvalCtx) -> CompileResult<(Val, DataType)> {
    let start_pos = stream.peek().pos.clone();

    if expected == DataType::Str {
        let save = stream.save();
        if let Ok((cond_val, cond_ty)) = evaluate_chain(stream, DataType::Int, ctx, &start_pos) {
            if stream.peek().kind.is_punct("?") {
                return finish_ternary(stream, cond_val, cond_ty, expected, ctx, &start_pos);
            }
        }
        stream.restore(save);
        let (val, ty) = evaluate_chain(stream, expected, ctx, &start_pos)?;
        check_compatible(ty, expected, &start_pos)?;
        return Ok((val, ty));
    }

    let (cond_val, cond_ty) = evaluate_chain(stream, expected, ctx, &start_pos)?;
    if !stream.peek().kind.is_punct("?") {
        check_compatible(cond_ty, expected, &start_pos)?;
        return Ok((cond_val, cond_ty));
    }
    finish_ternary(stream, cond_val, cond_ty, expected, ctx, &start_pos)
}

fn finish_ternary(
    stream: &mut TokenStream,
    cond_val: Val,
    cond_ty: DataType,
    expected: DataType,
    ctx: &mut EvalCtx,
    start_pos: &Pos,
) -> CompileResult<(Val, DataType)> {
    if cond_ty == DataType::Str {
        return Err(CompileError::at(ErrorKind::Type, start_pos.clone(), "`?:` condition may not be a string"));
    }
    stream.advance(); // the `?`
    let (true_val, true_ty) = evaluate_typed(stream, expected, ctx)?;
    stream.must_punct(":")?;
    let (false_val, false_ty) = evaluate_typed(stream, expected, ctx)?;
    if !(true_ty.compatible_with(false_ty) || false_ty.compatible_with(true_ty)) {
        return Err(CompileError::at(ErrorKind::Type, start_pos.clone(), "`?:` branches have different types"));
    }
    let result = apply_ternary(cond_val, true_val, false_val);
    Ok((result, true_ty))
}

fn check_compatible(ty: DataType, expected: DataType, pos: &Pos) -> CompileResult<()> {
    if ty.compatible_with(expected) {
        Ok(())
    } else {
        Err(CompileError::at(
            ErrorKind::Type,
            pos.clone(),
            format!("expected a `{}` expression, found `{}`", expected.name(), ty.name()),
        ))
    }
}

/// Builds the flat vector of unary/binary operators and values up to (but
/// not including) a top-level `?`, and reduces it to a single value.
fn evaluate_chain(stream: &mut TokenStream, expected: DataType, ctx: &mut EvalCtx, start_pos: &Pos) -> CompileResult<(Val, DataType)> {
    let mut syms = Vec::new();
    while let Some(sym) = parse_symbol(stream, expected, ctx)? {
        syms.push(sym);
    }
    if syms.is_empty() {
        return Err(CompileError::at(ErrorKind::Parse, start_pos.clone(), "expected an expression"));
    }

    fixup_unary_minus(&mut syms);
    validate(&syms, expected, start_pos)?;

    while syms.len() > 1 {
        reduce_once(&mut syms, start_pos)?;
    }

    match syms.into_iter().next() {
        Some(Sym::Value { val, ty }) => Ok((val, ty)),
        _ => Err(CompileError::at(ErrorKind::Parse, start_pos.clone(), "malformed expression")),
    }
}

// -- symbol parsing -------------------------------------------------------

fn parse_symbol(stream: &mut TokenStream, expected: DataType, ctx: &mut EvalCtx) -> CompileResult<Option<Sym>> {
    // `?` (and its `:`) terminate the flat chain; `evaluate_typed` handles
    // the ternary itself once `evaluate_chain` returns.
    if stream.peek().kind.is_punct("?") || stream.peek().kind.is_punct(":") {
        return Ok(None);
    }
    if let TokenKind::Punct(lexeme) = stream.peek().kind.clone() {
        // `-` and `!` always parse as unary here; the fixup pass retags a
        // `-` that turns out to be preceded by a value (spec §4.5).
        if let Some(def) = lookup_unary(lexeme) {
            stream.advance();
            return Ok(Some(Sym::Operator(def)));
        }
        if let Some(def) = lookup_binary(lexeme) {
            stream.advance();
            return Ok(Some(Sym::Operator(def)));
        }
        if lexeme == "(" {
            stream.advance();
            let inner = evaluate(stream, expected, ctx)?;
            stream.must_punct(")")?;
            return Ok(Some(Sym::value(inner, expected)));
        }
        return Ok(None);
    }

    if let TokenKind::Symbol(name) = stream.peek().kind.clone() {
        if stream.peek_at(1).kind.is_punct("(") && ctx.commands.lookup(&name).is_some() {
            let pos = stream.peek().pos.clone();
            let (ret_ty, buf) = parse_command_call(stream, ctx)?;
            if !ret_ty.compatible_with(expected) {
                return Err(CompileError::at(
                    ErrorKind::Type,
                    pos,
                    format!("command `{name}` returns `{}`, expected `{}`", ret_ty.name(), expected.name()),
                ));
            }
            return Ok(Some(Sym::value(Val::Buf(buf), ret_ty)));
        }
        let (val, ty) = parse_variable_load(stream, ctx)?;
        return Ok(Some(Sym::value(val, ty)));
    }

    if expected == DataType::Str {
        if let TokenKind::StringLiteral(s) = stream.peek().kind.clone() {
            let pos = stream.peek().pos.clone();
            stream.advance();
            let idx = ctx.strings.intern(&s, &pos)?;
            return Ok(Some(Sym::value(Val::Str(idx), DataType::Str)));
        }
        return Ok(None);
    }

    match stream.peek().kind.clone() {
        TokenKind::Number(n) => {
            stream.advance();
            Ok(Some(Sym::value(Val::Int(n), DataType::Int)))
        }
        TokenKind::Keyword("true") => {
            stream.advance();
            Ok(Some(Sym::value(Val::Int(1), DataType::Bool)))
        }
        TokenKind::Keyword("false") => {
            stream.advance();
            Ok(Some(Sym::value(Val::Int(0), DataType::Bool)))
        }
        _ => Ok(None),
    }
}

fn parse_variable_load(stream: &mut TokenStream, ctx: &mut EvalCtx) -> CompileResult<(Val, DataType)> {
    let (name, pos) = stream.must_symbol()?;
    let var = ctx
        .vars
        .lookup(&name)
        .ok_or_else(|| CompileError::at(ErrorKind::Semantic, pos.clone(), format!("unknown variable `{name}`")))?;
    let ty = var.ty;
    let is_constexpr = var.is_constexpr();
    let const_value = var.const_value;
    let is_array = var.is_array;
    let is_global = var.is_global();
    let index = var.index;

    if is_constexpr {
        let val = match const_value.expect("constexpr variable carries a value") {
            ConstValue::Int(n) => Val::Int(n),
            ConstValue::Bool(b) => Val::Int(b as i64),
            ConstValue::StrIndex(i) => Val::Str(i),
        };
        return Ok((val, ty));
    }

    if is_array {
        if !is_global {
            return Err(CompileError::at(
                ErrorKind::Semantic,
                pos,
                format!("`{name}` is a state-local array; only global arrays may be indexed"),
            ));
        }
        stream.must_punct("[")?;
        let index_val = evaluate(stream, DataType::Int, ctx)?;
        stream.must_punct("]")?;
        let mut buf = val_into_buffer(index_val);
        buf.write_header(Opcode::PushGlobalArray);
        buf.write_u32(index.expect("array variable carries a slot index"));
        return Ok((Val::Buf(buf), ty));
    }

    let mut buf = DataBuffer::new();
    buf.write_header(if is_global { Opcode::PushGlobalVar } else { Opcode::PushLocalVar });
    buf.write_u32(index.expect("mutable variable carries a slot index"));
    Ok((Val::Buf(buf), ty))
}

/// Parses `name(args...)` at the current position, where `name` is already
/// known to name a command. Shared with `botc-par`'s "command call as a
/// statement" (spec §4.6), which calls this directly and just discards the
/// return type.
pub fn parse_command_call(stream: &mut TokenStream, ctx: &mut EvalCtx) -> CompileResult<(DataType, DataBuffer)> {
    let (name, pos) = stream.must_symbol()?;
    let def = ctx
        .commands
        .lookup(&name)
        .ok_or_else(|| CompileError::at(ErrorKind::Semantic, pos.clone(), format!("unknown command `{name}`")))?
        .clone();
    stream.must_punct("(")?;

    let mut args = Vec::new();
    if !stream.peek().kind.is_punct(")") {
        loop {
            let arg_index = args.len();
            if arg_index >= def.max_args() {
                return Err(CompileError::at(
                    ErrorKind::Semantic,
                    pos.clone(),
                    format!("`{name}` takes at most {} arguments", def.max_args()),
                ));
            }
            let arg_ty = def.args[arg_index].ty;
            let val = evaluate(stream, arg_ty, ctx)?;
            args.push(val_into_buffer(val));
            if stream.consume_punct(",") {
                continue;
            }
            break;
        }
    }
    stream.must_punct(")")?;

    if args.len() < def.min_args {
        return Err(CompileError::at(
            ErrorKind::Semantic,
            pos,
            format!("`{name}` requires at least {} arguments", def.min_args),
        ));
    }
    for i in args.len()..def.max_args() {
        let default = def.args[i].default.ok_or_else(|| {
            CompileError::at(ErrorKind::Semantic, pos.clone(), format!("missing required argument {} to `{name}`", i + 1))
        })?;
        let default_val = match default {
            ConstValue::Int(n) => Val::Int(n),
            ConstValue::Bool(b) => Val::Int(b as i64),
            ConstValue::StrIndex(s) => Val::Str(s),
        };
        args.push(val_into_buffer(default_val));
    }

    let arg_count = args.len() as u32;
    let mut buf = DataBuffer::new();
    for arg in args {
        buf.merge(arg);
    }
    if def.is_builtin {
        buf.write_u32(def.opcode_number);
    } else {
        buf.write_header(Opcode::Command);
        buf.write_u32(def.opcode_number);
        buf.write_u32(arg_count);
    }
    Ok((def.return_type, buf))
}

/// Lowers a [`Val`] to a buffer that computes it, materializing constexpr
/// operands as their push opcodes. Exposed so `botc-par` can splice an
/// evaluated expression's result straight into whatever buffer a statement
/// (an assignment, an `if` condition, a bare command call) is emitting
/// into, without re-deriving this logic.
pub fn val_into_buffer(val: Val) -> DataBuffer {
    match val {
        Val::Buf(b) => b,
        Val::Int(n) => {
            let mut b = DataBuffer::new();
            b.write_header(Opcode::PushNumber);
            if n < 0 {
                b.write_u32(n.unsigned_abs() as u32);
                b.write_header(Opcode::UnaryMinus);
            } else {
                b.write_u32(n as u32);
            }
            b
        }
        Val::Str(idx) => {
            let mut b = DataBuffer::new();
            b.write_header(Opcode::PushStringIndex);
            b.write_u32(idx);
            b
        }
    }
}

// -- fixup, validation, reduction -----------------------------------------

/// Spec §4.5 "Fixup pass": the parser always matches a lone `-` as unary
/// first; any `-` immediately preceded by a value was actually binary
/// subtraction.
fn fixup_unary_minus(syms: &mut [Sym]) {
    for i in 1..syms.len() {
        let is_unary_minus = matches!(
            &syms[i],
            Sym::Operator(o) if o.arity == Arity::Unary && o.opcode == Some(Opcode::UnaryMinus)
        );
        if is_unary_minus && syms[i - 1].is_value() {
            let subtract = lookup_binary("-").expect("`-` has a binary row");
            syms[i] = Sym::Operator(subtract);
        }
    }
}

fn validate(syms: &[Sym], expected: DataType, pos: &Pos) -> CompileResult<()> {
    if expected == DataType::Str && syms.len() != 1 {
        return Err(CompileError::at(ErrorKind::Type, pos.clone(), "a string expression may not use any operator"));
    }

    for (i, sym) in syms.iter().enumerate() {
        match sym {
            Sym::Operator(op) => match op.arity {
                Arity::Unary => {
                    if !syms.get(i + 1).map(Sym::is_value).unwrap_or(false) {
                        return Err(CompileError::at(
                            ErrorKind::Parse,
                            pos.clone(),
                            format!("operator `{}` is missing its operand", op.lexeme),
                        ));
                    }
                }
                Arity::Binary => {
                    let left_ok = i > 0 && syms[i - 1].is_value();
                    let right_ok = syms.get(i + 1).map(Sym::is_value).unwrap_or(false);
                    if !left_ok || !right_ok {
                        return Err(CompileError::at(
                            ErrorKind::Parse,
                            pos.clone(),
                            format!("operator `{}` is missing an operand", op.lexeme),
                        ));
                    }
                    if matches!(&syms[i - 1], Sym::Value { ty: DataType::Str, .. })
                        || matches!(syms.get(i + 1), Some(Sym::Value { ty: DataType::Str, .. }))
                    {
                        return Err(CompileError::at(ErrorKind::Type, pos.clone(), "operator applied to a string expression"));
                    }
                }
                Arity::Ternary => {
                    unreachable!("the ternary never enters the flat vector")
                }
            },
            Sym::Value { .. } => {}
        }
    }
    Ok(())
}

fn reduce_once(syms: &mut Vec<Sym>, pos: &Pos) -> CompileResult<()> {
    let idx = syms
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.as_operator().map(|o| (i, o.priority)))
        .min_by_key(|&(_, p)| p)
        .map(|(i, _)| i)
        .ok_or_else(|| CompileError::at(ErrorKind::Parse, pos.clone(), "malformed expression"))?;

    let op = *syms[idx].as_operator().expect("just matched an operator");
    match op.arity {
        Arity::Unary => {
            let operand = syms.remove(idx + 1);
            syms[idx] = apply_unary(op, operand, pos)?;
        }
        Arity::Binary => {
            let right = syms.remove(idx + 1);
            let left = syms.remove(idx - 1);
            // after removing `left` everything shifted left by one, so the
            // operator is now at `idx - 1`.
            syms[idx - 1] = apply_binary(op, left, right, pos)?;
        }
        Arity::Ternary => unreachable!("the ternary never enters the flat vector"),
    }
    Ok(())
}

fn apply_unary(op: OperatorDef, operand: Sym, pos: &Pos) -> CompileResult<Sym> {
    let Sym::Value { val, ty } = operand else {
        return Err(CompileError::at(ErrorKind::Parse, pos.clone(), "expected a value"));
    };
    if let Some(n) = val.as_const_int() {
        let folded = match op.opcode {
            Some(Opcode::NegateLogical) => i64::from(n == 0),
            Some(Opcode::UnaryMinus) => n.wrapping_neg(),
            _ => unreachable!("only `!` and unary `-` are unary operators"),
        };
        let result_ty = if op.opcode == Some(Opcode::NegateLogical) { DataType::Bool } else { ty };
        return Ok(Sym::value(Val::Int(folded), result_ty));
    }
    let mut buf = val_into_buffer(val);
    buf.write_header(op.opcode.expect("unary operator has an opcode"));
    let result_ty = if op.opcode == Some(Opcode::NegateLogical) { DataType::Bool } else { ty };
    Ok(Sym::value(Val::Buf(buf), result_ty))
}

fn apply_binary(op: OperatorDef, left: Sym, right: Sym, pos: &Pos) -> CompileResult<Sym> {
    let (Sym::Value { val: lv, ty: lty }, Sym::Value { val: rv, ty: _ }) = (left, right) else {
        return Err(CompileError::at(ErrorKind::Parse, pos.clone(), "expected values around an operator"));
    };
    let is_comparison = matches!(
        op.opcode,
        Some(
            Opcode::LessThan
                | Opcode::GreaterThan
                | Opcode::AtLeast
                | Opcode::AtMost
                | Opcode::Equals
                | Opcode::NotEquals
                | Opcode::AndLogical
                | Opcode::OrLogical
        )
    );
    let result_ty = if is_comparison { DataType::Bool } else { lty };

    if let (Some(a), Some(b)) = (lv.as_const_int(), rv.as_const_int()) {
        let folded = fold_binary(op, a, b, pos)?;
        return Ok(Sym::value(Val::Int(folded), result_ty));
    }

    let mut buf = val_into_buffer(lv);
    buf.merge(val_into_buffer(rv));
    buf.write_header(op.opcode.expect("binary operator has an opcode"));
    Ok(Sym::value(Val::Buf(buf), result_ty))
}

fn fold_binary(op: OperatorDef, a: i64, b: i64, pos: &Pos) -> CompileResult<i64> {
    use Opcode::*;
    let opcode = op.opcode.expect("binary operator has an opcode");
    Ok(match opcode {
        Multiply => a.wrapping_mul(b),
        Divide => {
            if b == 0 {
                return Err(CompileError::at(ErrorKind::Arithmetic, pos.clone(), "division by zero"));
            }
            a.wrapping_div(b)
        }
        Modulus => {
            if b == 0 {
                return Err(CompileError::at(ErrorKind::Arithmetic, pos.clone(), "modulus by zero"));
            }
            a.wrapping_rem(b)
        }
        Add => a.wrapping_add(b),
        Subtract => a.wrapping_sub(b),
        LeftShift => a.wrapping_shl(b as u32 & 63),
        RightShift => a.wrapping_shr(b as u32 & 63),
        LessThan => i64::from(a < b),
        GreaterThan => i64::from(a > b),
        AtLeast => i64::from(a >= b),
        AtMost => i64::from(a <= b),
        Equals => i64::from(a == b),
        NotEquals => i64::from(a != b),
        AndBitwise => a & b,
        EorBitwise => a ^ b,
        OrBitwise => a | b,
        AndLogical => i64::from(a != 0 && b != 0),
        OrLogical => i64::from(a != 0 || b != 0),
        other => unreachable!("{other:?} is not a binary arithmetic opcode"),
    })
}

/// Lowers `cond ? true_val : false_val`. A constexpr condition is dead-branch
/// avoidance: the untaken side's code is simply never emitted, and no
/// if/goto skeleton is needed at all. Both branches were already parsed and
/// folded by the time this runs, so a dead branch still has to be valid
/// code — only its *emission* is skipped.
fn apply_ternary(cond: Val, true_val: Val, false_val: Val) -> Val {
    if let Some(c) = cond.as_const_int() {
        return if c != 0 { true_val } else { false_val };
    }

    let mut result = DataBuffer::new();
    result.merge(val_into_buffer(cond));
    let false_mark = result.add_mark("ternary_false");
    result.write_header(Opcode::IfNotGoto);
    result.add_reference(false_mark);
    result.merge(val_into_buffer(true_val));
    let end_mark = result.add_mark("ternary_end");
    result.write_header(Opcode::Goto);
    result.add_reference(end_mark);
    result.adjust_mark(false_mark);
    result.merge(val_into_buffer(false_val));
    result.adjust_mark(end_mark);

    Val::Buf(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_sym::{CommandArg, CommandDef, StringPool, Variable, Writability};
    use botc_util::{file_name, Pos};

    struct NoVars;
    impl VarLookup for NoVars {
        fn lookup(&self, _name: &str) -> Option<&Variable> {
            None
        }
    }

    struct OneVar(Variable);
    impl VarLookup for OneVar {
        fn lookup(&self, name: &str) -> Option<&Variable> {
            if self.0.name == name {
                Some(&self.0)
            } else {
                None
            }
        }
    }

    fn pos() -> Pos {
        Pos::new(file_name("t.bts"), 1, 1)
    }

    fn stream_of(src: &str) -> TokenStream {
        let mut scanner = botc_lex::Scanner::new(file_name("t.bts"), src.as_bytes().to_vec());
        let mut toks = Vec::new();
        loop {
            let tok = scanner.next_token().unwrap();
            let eof = matches!(tok.kind, TokenKind::Eof);
            toks.push(tok);
            if eof {
                break;
            }
        }
        TokenStream::from_tokens(toks)
    }

    fn const_int_var(name: &str, n: i64) -> Variable {
        Variable {
            name: name.to_string(),
            owning_state: String::new(),
            ty: DataType::Int,
            writability: Writability::Constexpr,
            is_array: false,
            index: None,
            origin: pos(),
            const_value: Some(ConstValue::Int(n)),
        }
    }

    #[test]
    fn folds_arithmetic_with_correct_precedence() {
        let mut strings = StringPool::new();
        let commands = CommandTable::new();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("2 + 3 * 4");
        let val = evaluate(&mut stream, DataType::Int, &mut ctx).unwrap();
        assert_eq!(val.as_const_int(), Some(14));
    }

    #[test]
    fn unary_minus_after_value_becomes_subtraction() {
        let mut strings = StringPool::new();
        let commands = CommandTable::new();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("10 - 4 - 1");
        let val = evaluate(&mut stream, DataType::Int, &mut ctx).unwrap();
        assert_eq!(val.as_const_int(), Some(5));
    }

    #[test]
    fn division_by_zero_constant_is_an_error() {
        let mut strings = StringPool::new();
        let commands = CommandTable::new();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("1 / 0");
        assert!(evaluate(&mut stream, DataType::Int, &mut ctx).is_err());
    }

    #[test]
    fn constant_ternary_drops_the_untaken_branchs_code() {
        // Both branches are still parsed and folded (a bad dead branch is
        // still a compile error), but the constant condition means only the
        // taken branch's value survives into the result — no if/goto
        // skeleton, and the other branch's generated code is discarded.
        let mut strings = StringPool::new();
        let mut commands = CommandTable::new();
        commands
            .define(
                CommandDef {
                    opcode_number: 3,
                    is_builtin: true,
                    name: "flag".to_string(),
                    return_type: DataType::Int,
                    args: vec![],
                    min_args: 0,
                },
                &pos(),
            )
            .unwrap();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("1 ? 7 : flag()");
        let val = evaluate(&mut stream, DataType::Int, &mut ctx).unwrap();
        assert_eq!(val.as_const_int(), Some(7));
    }

    #[test]
    fn constant_false_branch_with_a_fatal_dead_branch_still_errors() {
        // Dropping the dead branch's bytecode doesn't mean skipping
        // compilation of it: division by zero is caught regardless.
        let mut strings = StringPool::new();
        let commands = CommandTable::new();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("1 ? 7 : 1/0");
        assert!(evaluate(&mut stream, DataType::Int, &mut ctx).is_err());
    }

    #[test]
    fn non_constant_ternary_emits_if_goto_skeleton() {
        // Condition is a call to a builtin returning bool, so it can't fold.
        let mut strings = StringPool::new();
        let mut commands = CommandTable::new();
        commands
            .define(
                CommandDef {
                    opcode_number: 3,
                    is_builtin: true,
                    name: "flag".to_string(),
                    return_type: DataType::Bool,
                    args: vec![],
                    min_args: 0,
                },
                &pos(),
            )
            .unwrap();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("flag() ? 1 : 2");
        let val = evaluate(&mut stream, DataType::Int, &mut ctx).unwrap();
        match val {
            Val::Buf(buf) => {
                assert_eq!(buf.marks().len(), 2);
                assert_eq!(buf.refs().len(), 2);
            }
            other => panic!("expected a buffer, got {other:?}"),
        }
    }

    #[test]
    fn string_expression_rejects_operators() {
        let mut strings = StringPool::new();
        let commands = CommandTable::new();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("\"a\" + \"b\"");
        assert!(evaluate(&mut stream, DataType::Str, &mut ctx).is_err());
    }

    #[test]
    fn variable_load_inlines_constexpr_values() {
        let mut strings = StringPool::new();
        let commands = CommandTable::new();
        let v = const_int_var("k", 42);
        let vars = OneVar(v);
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("k + 1");
        let val = evaluate(&mut stream, DataType::Int, &mut ctx).unwrap();
        assert_eq!(val.as_const_int(), Some(43));
    }

    #[test]
    fn builtin_command_call_omits_argument_count() {
        let mut strings = StringPool::new();
        let mut commands = CommandTable::new();
        commands
            .define(
                CommandDef {
                    opcode_number: 9,
                    is_builtin: true,
                    name: "rand".to_string(),
                    return_type: DataType::Int,
                    args: vec![CommandArg { ty: DataType::Int, name: "max".to_string(), default: None }],
                    min_args: 1,
                },
                &pos(),
            )
            .unwrap();
        let vars = NoVars;
        let mut ctx = EvalCtx { strings: &mut strings, commands: &commands, vars: &vars };
        let mut stream = stream_of("rand(10)");
        let (_, buf) = parse_command_call(&mut stream, &mut ctx).unwrap();
        // PushNumber header + value (8 bytes) + the builtin's raw opcode number (4 bytes).
        assert_eq!(buf.bytes().len(), 12);
    }
}
