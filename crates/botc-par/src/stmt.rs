//! Statement forms (spec §4.6 "Statements"): `if`/`else`, `while`, `for`,
//! `do...while`, `switch`/`case`/`default`, `break`, `continue`, assignment,
//! and a bare command call.
//!
//! `switch` is the one construct here that doesn't fit the rest of the
//! file's "emit as you go" style. A `case N:` header has to jump to a body
//! whose own code comes later in the token stream, and `botc-buf`'s marks
//! only resolve within the buffer that owns them — so instead of stashing
//! each case's body in its own scratch buffer (which would leave a `break`
//! inside it unable to reach the switch's own end mark, owned by a
//! different buffer), the whole switch is scanned twice over the same
//! `save()`/`restore()` window botc-eval's ternary disambiguation already
//! uses: once to read off case values and lay down the jump table, once
//! more to actually emit each body in place. Every mark the switch ever
//! touches then lives in the one buffer the whole construct was written
//! into.

use botc_buf::{DataBuffer, MarkId};
use botc_isa::Opcode;
use botc_lex::TokenKind;
use botc_sym::{DataType, Variable};
use botc_util::{CompileError, CompileResult, ErrorKind};

use crate::decl::{parse_var_decl, peek_starts_decl};
use crate::scope::ScopeKind;
use crate::Parser;

pub(crate) fn parse_stmt_list(p: &mut Parser, terminator: &str) -> CompileResult<()> {
    loop {
        if p.stream.consume_punct(terminator) {
            return Ok(());
        }
        parse_stmt(p)?;
    }
}

fn parse_stmt(p: &mut Parser) -> CompileResult<()> {
    if peek_starts_decl(p) {
        let state_name = p.current_state.clone();
        return parse_var_decl(p, state_name);
    }

    match p.stream.peek().kind.clone() {
        TokenKind::Keyword("if") => parse_if(p),
        TokenKind::Keyword("while") => parse_while(p),
        TokenKind::Keyword("for") => parse_for(p),
        TokenKind::Keyword("do") => parse_do_while(p),
        TokenKind::Keyword("switch") => parse_switch(p),
        TokenKind::Keyword("break") => parse_break(p),
        TokenKind::Keyword("continue") => parse_continue(p),
        TokenKind::Punct("{") => {
            p.stream.advance();
            p.scopes.push(ScopeKind::Unknown);
            parse_stmt_list(p, "}")?;
            p.scopes.pop()?;
            Ok(())
        }
        TokenKind::Symbol(_) => parse_assignment_or_call(p),
        _ => Err(p.stream.expected("a statement")),
    }
}

fn eval_bool(p: &mut Parser) -> CompileResult<()> {
    let mut ctx = crate::eval_ctx(&mut *p.strings, p.commands, &p.scopes);
    let val = botc_eval::evaluate(p.stream, DataType::Bool, &mut ctx)?;
    let buf = botc_eval::val_into_buffer(val);
    p.emit_buffer().merge(buf);
    Ok(())
}

/// `if (expr) { ... } [else { ... }]` (spec §4.6). The closing `}` adjusts
/// `M1` to the position right after the body; if an `else` follows (brace
/// insertion has already turned `else if` into `else { if ... }`, so the
/// `else` body is always a plain brace block), a `Goto M2` jump-over-else
/// is written first and `M1` is adjusted a second time, past that jump.
fn parse_if(p: &mut Parser) -> CompileResult<()> {
    p.stream.advance(); // if
    p.stream.must_punct("(")?;
    eval_bool(p)?;
    p.stream.must_punct(")")?;

    let m1 = p.emit_buffer().add_mark("if_end");
    p.emit_buffer().write_header(Opcode::IfNotGoto);
    p.emit_buffer().add_reference(m1);

    p.scopes.push(ScopeKind::If);
    p.scopes.top_mut().mark1 = Some(m1);
    p.stream.must_punct("{")?;
    parse_stmt_list(p, "}")?;
    p.scopes.pop()?;

    p.emit_buffer().adjust_mark(m1);

    if p.stream.consume_keyword("else") {
        let m2 = p.emit_buffer().add_mark("else_end");
        p.emit_buffer().write_header(Opcode::Goto);
        p.emit_buffer().add_reference(m2);
        p.emit_buffer().adjust_mark(m1);

        p.scopes.push(ScopeKind::Else);
        p.scopes.top_mut().mark2 = Some(m2);
        p.stream.must_punct("{")?;
        parse_stmt_list(p, "}")?;
        p.scopes.pop()?;

        p.emit_buffer().adjust_mark(m2);
    }
    Ok(())
}

/// `while (expr) { ... }`: `M1` marks the condition check, `M2` the exit.
fn parse_while(p: &mut Parser) -> CompileResult<()> {
    p.stream.advance(); // while
    let m1 = p.emit_buffer().add_mark("while_start");
    p.stream.must_punct("(")?;
    eval_bool(p)?;
    p.stream.must_punct(")")?;

    let m2 = p.emit_buffer().add_mark("while_end");
    p.emit_buffer().write_header(Opcode::IfNotGoto);
    p.emit_buffer().add_reference(m2);

    p.scopes.push(ScopeKind::While);
    {
        let frame = p.scopes.top_mut();
        frame.mark1 = Some(m1);
        frame.mark2 = Some(m2);
    }
    p.stream.must_punct("{")?;
    parse_stmt_list(p, "}")?;
    p.scopes.pop()?;

    p.emit_buffer().write_header(Opcode::Goto);
    p.emit_buffer().add_reference(m1);
    p.emit_buffer().adjust_mark(m2);
    Ok(())
}

/// `do { ... } while (expr);`: a single entry mark `M1`; the trailing
/// condition is an `IfGoto` back to it. No exit mark exists, so (per spec
/// §4.6) `break` cannot target a bare `do...while` — see
/// `ScopeStack::innermost_break_target`.
fn parse_do_while(p: &mut Parser) -> CompileResult<()> {
    p.stream.advance(); // do
    let m1 = p.emit_buffer().add_mark("do_start");

    p.scopes.push(ScopeKind::Do);
    p.scopes.top_mut().mark1 = Some(m1);
    p.stream.must_punct("{")?;
    parse_stmt_list(p, "}")?;
    p.scopes.pop()?;

    p.stream.must_keyword("while")?;
    p.stream.must_punct("(")?;
    eval_bool(p)?;
    p.stream.must_punct(")")?;
    p.stream.must_punct(";")?;

    p.emit_buffer().write_header(Opcode::IfGoto);
    p.emit_buffer().add_reference(m1);
    Ok(())
}

/// `for (init; cond; incr) { body }`. `init` and `cond` emit in place as
/// they're read; `incr` is parsed here (textually, before the body) but
/// must run after it, so it's written into a scratch buffer and replayed
/// immediately before the loop-back `Goto` (spec §3's "secondary buffer").
fn parse_for(p: &mut Parser) -> CompileResult<()> {
    p.stream.advance(); // for
    p.stream.must_punct("(")?;

    if !p.stream.consume_punct(";") {
        parse_assignment(p)?;
        p.stream.must_punct(";")?;
    }

    let m1 = p.emit_buffer().add_mark("for_cond");
    eval_bool(p)?;
    p.stream.must_punct(";")?;

    let m2 = p.emit_buffer().add_mark("for_end");
    p.emit_buffer().write_header(Opcode::IfNotGoto);
    p.emit_buffer().add_reference(m2);

    p.scopes.push(ScopeKind::For);
    {
        let frame = p.scopes.top_mut();
        frame.mark1 = Some(m1);
        frame.mark2 = Some(m2);
    }

    let before_incr = std::mem::replace(p.emit_buffer(), DataBuffer::new());
    if !p.stream.peek().kind.is_punct(")") {
        parse_assignment(p)?;
    }
    let incr_buf = std::mem::replace(p.emit_buffer(), before_incr);
    p.stream.must_punct(")")?;
    p.scopes.top_mut().secondary = Some(incr_buf);

    p.stream.must_punct("{")?;
    parse_stmt_list(p, "}")?;
    let frame = p.scopes.pop()?;

    if let Some(incr) = frame.secondary {
        p.emit_buffer().merge(incr);
    }
    p.emit_buffer().write_header(Opcode::Goto);
    p.emit_buffer().add_reference(m1);
    p.emit_buffer().adjust_mark(m2);
    Ok(())
}

fn parse_break(p: &mut Parser) -> CompileResult<()> {
    let pos = p.stream.peek().pos.clone();
    p.stream.advance();
    p.stream.must_punct(";")?;
    let target = p
        .scopes
        .innermost_break_target()
        .ok_or_else(|| CompileError::at(ErrorKind::Parse, pos, "`break` outside a loop, `if`, or `switch`"))?;
    p.emit_buffer().write_header(Opcode::Goto);
    p.emit_buffer().add_reference(target);
    Ok(())
}

fn parse_continue(p: &mut Parser) -> CompileResult<()> {
    let pos = p.stream.peek().pos.clone();
    p.stream.advance();
    p.stream.must_punct(";")?;
    let target = p
        .scopes
        .innermost_continue_target()
        .ok_or_else(|| CompileError::at(ErrorKind::Parse, pos, "`continue` outside a loop"))?;
    p.emit_buffer().write_header(Opcode::Goto);
    p.emit_buffer().add_reference(target);
    Ok(())
}

/// Skips a `case`/`default` body during the switch's first pass: tracks
/// brace depth and stops at the next `case`/`default` seen at depth 0, or
/// at the switch's own closing `}`.
fn skip_case_body(p: &mut Parser) -> CompileResult<()> {
    let mut depth = 0i32;
    loop {
        match p.stream.peek().kind.clone() {
            TokenKind::Eof => return Err(p.stream.expected("`case`, `default`, or `}`")),
            TokenKind::Punct("{") => {
                depth += 1;
                p.stream.advance();
            }
            TokenKind::Punct("}") if depth > 0 => {
                depth -= 1;
                p.stream.advance();
            }
            TokenKind::Punct("}") => return Ok(()),
            TokenKind::Keyword("case") | TokenKind::Keyword("default") if depth == 0 => return Ok(()),
            _ => {
                p.stream.advance();
            }
        }
    }
}

fn parse_case_label(p: &mut Parser) -> CompileResult<(i64, botc_util::Pos)> {
    let negative = p.stream.consume_punct("-");
    let pos = p.stream.peek().pos.clone();
    let n = match p.stream.peek().kind.clone() {
        TokenKind::Number(n) => {
            p.stream.advance();
            n
        }
        _ => return Err(p.stream.expected("a numeric `case` label")),
    };
    Ok((if negative { -n } else { n }, pos))
}

/// `switch (expr) { case N: ... default: ... }` (spec §4.6, invariant 8).
/// See this module's header comment for why two passes over the same
/// token window are used instead of per-case scratch buffers.
fn parse_switch(p: &mut Parser) -> CompileResult<()> {
    p.stream.advance(); // switch
    p.stream.must_punct("(")?;
    {
        let mut ctx = crate::eval_ctx(&mut *p.strings, p.commands, &p.scopes);
        let val = botc_eval::evaluate(p.stream, DataType::Int, &mut ctx)?;
        let buf = botc_eval::val_into_buffer(val);
        p.emit_buffer().merge(buf);
    }
    p.stream.must_punct(")")?;
    p.stream.must_punct("{")?;

    let body_start = p.stream.save();
    let mut cases: Vec<(i64, MarkId)> = Vec::new();
    let mut default_mark: Option<MarkId> = None;

    loop {
        match p.stream.peek().kind.clone() {
            TokenKind::Keyword("case") => {
                p.stream.advance();
                let (value, pos) = parse_case_label(p)?;
                p.stream.must_punct(":")?;
                if cases.iter().any(|(v, _)| *v == value) {
                    return Err(CompileError::at(ErrorKind::Semantic, pos, format!("duplicate `case {value}`")));
                }
                let mark = p.emit_buffer().add_mark("case");
                p.emit_buffer().write_header(Opcode::CaseGoto);
                p.emit_buffer().write_i32(value as i32);
                p.emit_buffer().add_reference(mark);
                cases.push((value, mark));
                skip_case_body(p)?;
            }
            TokenKind::Keyword("default") => {
                let pos = p.stream.peek().pos.clone();
                p.stream.advance();
                p.stream.must_punct(":")?;
                if default_mark.is_some() {
                    return Err(CompileError::at(ErrorKind::Semantic, pos, "at most one `default:` per `switch`"));
                }
                default_mark = Some(p.emit_buffer().add_mark("default"));
                skip_case_body(p)?;
            }
            TokenKind::Punct("}") => break,
            _ => return Err(p.stream.expected("`case`, `default`, or `}`")),
        }
    }

    p.scopes.push(ScopeKind::Switch);
    let end_mark = p.emit_buffer().add_mark("switch_end");
    p.scopes.top_mut().mark1 = Some(end_mark);

    p.emit_buffer().write_header(Opcode::Drop);
    p.emit_buffer().write_header(Opcode::Goto);
    p.emit_buffer().add_reference(default_mark.unwrap_or(end_mark));

    p.stream.restore(body_start);

    let mut remaining_cases = cases.into_iter();
    loop {
        match p.stream.peek().kind.clone() {
            TokenKind::Keyword("case") => {
                p.stream.advance();
                parse_case_label(p)?;
                p.stream.must_punct(":")?;
                let (_, mark) = remaining_cases.next().expect("pass one recorded every case header");
                p.emit_buffer().adjust_mark(mark);
            }
            TokenKind::Keyword("default") => {
                p.stream.advance();
                p.stream.must_punct(":")?;
                p.emit_buffer().adjust_mark(default_mark.expect("pass one recorded a mark for every `default:` seen"));
            }
            TokenKind::Punct("}") => {
                p.stream.advance();
                break;
            }
            _ => unreachable!("pass one already validated this exact token sequence"),
        }
        loop {
            match p.stream.peek().kind {
                TokenKind::Keyword("case") | TokenKind::Keyword("default") | TokenKind::Punct("}") => break,
                _ => parse_stmt(p)?,
            }
        }
    }

    p.scopes.pop()?;
    p.emit_buffer().adjust_mark(end_mark);
    Ok(())
}

/// `name ( args );` or `name[index]? (=|+=|-=|*=|/=|%=|++|--) [expr] ;`
fn parse_assignment_or_call(p: &mut Parser) -> CompileResult<()> {
    if p.stream.peek_at(1).kind.is_punct("(") {
        let mut ctx = crate::eval_ctx(&mut *p.strings, p.commands, &p.scopes);
        let (_, buf) = botc_eval::parse_command_call(p.stream, &mut ctx)?;
        p.emit_buffer().merge(buf);
        p.stream.must_punct(";")?;
        return Ok(());
    }
    parse_assignment(p)?;
    p.stream.must_punct(";")?;
    Ok(())
}

enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    Inc,
    Dec,
}

fn opcode_for(op: &AssignOp, is_array: bool, is_global: bool) -> Opcode {
    use AssignOp::*;
    use Opcode::*;
    match (is_array, is_global, op) {
        (true, _, Assign) => AssignGlobalArray,
        (true, _, AddAssign) => AddAssignGlobalArray,
        (true, _, SubAssign) => SubAssignGlobalArray,
        (true, _, MulAssign) => MulAssignGlobalArray,
        (true, _, DivAssign) => DivAssignGlobalArray,
        (true, _, ModAssign) => ModAssignGlobalArray,
        (true, _, Inc) => IncGlobalArray,
        (true, _, Dec) => DecGlobalArray,
        (false, true, Assign) => AssignGlobalVar,
        (false, true, AddAssign) => AddAssignGlobalVar,
        (false, true, SubAssign) => SubAssignGlobalVar,
        (false, true, MulAssign) => MulAssignGlobalVar,
        (false, true, DivAssign) => DivAssignGlobalVar,
        (false, true, ModAssign) => ModAssignGlobalVar,
        (false, true, Inc) => IncGlobalVar,
        (false, true, Dec) => DecGlobalVar,
        (false, false, Assign) => AssignLocalVar,
        (false, false, AddAssign) => AddAssignLocalVar,
        (false, false, SubAssign) => SubAssignLocalVar,
        (false, false, MulAssign) => MulAssignLocalVar,
        (false, false, DivAssign) => DivAssignLocalVar,
        (false, false, ModAssign) => ModAssignLocalVar,
        (false, false, Inc) => IncLocalVar,
        (false, false, Dec) => DecLocalVar,
    }
}

/// `name = expr`, `name[idx] += expr`, `name++`, ... with no trailing `;`
/// (the caller owns that, since `for`'s clauses reuse this without one).
fn parse_assignment(p: &mut Parser) -> CompileResult<()> {
    let (name, pos) = p.stream.must_symbol()?;
    let var = p
        .scopes
        .lookup(&name)
        .cloned()
        .ok_or_else(|| CompileError::at(ErrorKind::Semantic, pos.clone(), format!("unknown variable `{name}`")))?;
    check_writable(&var, &pos)?;

    let mut index_buf: Option<DataBuffer> = None;
    if p.stream.consume_punct("[") {
        if !var.is_array {
            return Err(CompileError::at(ErrorKind::Semantic, pos.clone(), format!("`{name}` is not an array")));
        }
        let mut ctx = crate::eval_ctx(&mut *p.strings, p.commands, &p.scopes);
        let idx_val = botc_eval::evaluate(p.stream, DataType::Int, &mut ctx)?;
        index_buf = Some(botc_eval::val_into_buffer(idx_val));
        p.stream.must_punct("]")?;
    } else if var.is_array {
        return Err(CompileError::at(ErrorKind::Semantic, pos.clone(), format!("`{name}` is an array and must be indexed")));
    }

    let op = match p.stream.peek().kind.clone() {
        TokenKind::Punct("=") => AssignOp::Assign,
        TokenKind::Punct("+=") => AssignOp::AddAssign,
        TokenKind::Punct("-=") => AssignOp::SubAssign,
        TokenKind::Punct("*=") => AssignOp::MulAssign,
        TokenKind::Punct("/=") => AssignOp::DivAssign,
        TokenKind::Punct("%=") => AssignOp::ModAssign,
        TokenKind::Punct("++") => AssignOp::Inc,
        TokenKind::Punct("--") => AssignOp::Dec,
        _ => return Err(p.stream.expected("an assignment operator")),
    };
    p.stream.advance();

    let rhs_buf = match op {
        AssignOp::Inc | AssignOp::Dec => None,
        _ => {
            let mut ctx = crate::eval_ctx(&mut *p.strings, p.commands, &p.scopes);
            let val = botc_eval::evaluate(p.stream, var.ty, &mut ctx)?;
            Some(botc_eval::val_into_buffer(val))
        }
    };

    if let Some(idx) = index_buf {
        p.emit_buffer().merge(idx);
    }
    if let Some(rhs) = rhs_buf {
        p.emit_buffer().merge(rhs);
    }

    let opcode = opcode_for(&op, var.is_array, var.is_global());
    let index = var.index.expect("a mutable or const-indexed variable always carries a slot index");
    p.emit_buffer().write_header(opcode);
    p.emit_buffer().write_u32(index);
    Ok(())
}

fn check_writable(var: &Variable, pos: &botc_util::Pos) -> CompileResult<()> {
    if var.is_writable() {
        Ok(())
    } else {
        Err(CompileError::at(ErrorKind::Semantic, pos.clone(), format!("`{}` is not writable", var.name)))
    }
}
