//! The definitions-file grammar (`botc_defs.bts`, spec §4.3 "Event
//! definition", "Command definition").
//!
//! Distinct top-level grammar from the rest of the parser: no `state`
//! bodies, no bytecode emission, just declarations into the shared
//! `botc-sym` tables. Default argument values are restricted to literal
//! `int`/`bool` constants — spec §6 bars string-typed parameters from
//! having one at all, so there's never a reason to reach for the full
//! expression evaluator (and its `StringPool` dependency) here.

use botc_lex::{TokenKind, TokenStream};
use botc_sym::{CommandArg, CommandDef, CommandTable, ConstValue, DataType, EventDef, EventTable};
use botc_util::{CompileError, CompileResult, ErrorKind, Pos};

pub fn compile_defs(stream: &mut TokenStream, events: &mut EventTable, commands: &mut CommandTable) -> CompileResult<()> {
    while !stream.is_eof() {
        parse_def(stream, events, commands)?;
    }
    Ok(())
}

fn parse_def(stream: &mut TokenStream, events: &mut EventTable, commands: &mut CommandTable) -> CompileResult<()> {
    if stream.consume_keyword("eventdef") {
        return parse_eventdef(stream, events);
    }
    if let Some(is_builtin) = match stream.peek().kind.clone() {
        TokenKind::Keyword("funcdef") => Some(false),
        TokenKind::Keyword("builtindef") => Some(true),
        _ => None,
    } {
        stream.advance();
        return parse_funcdef(stream, commands, is_builtin);
    }
    Err(stream.expected("`eventdef`, `funcdef`, or `builtindef`"))
}

/// `eventdef NUM : NAME ( );`
fn parse_eventdef(stream: &mut TokenStream, events: &mut EventTable) -> CompileResult<()> {
    let number = parse_u32_literal(stream)?;
    stream.must_punct(":")?;
    let (name, pos) = stream.must_symbol()?;
    stream.must_punct("(")?;
    stream.must_punct(")")?;
    stream.must_punct(";")?;
    events.define(EventDef { number, name }, &pos)
}

/// `[funcdef|builtindef] RETTYPE NUM : NAME ( [ARG [= DEFAULT] [, ...]] );`
fn parse_funcdef(stream: &mut TokenStream, commands: &mut CommandTable, is_builtin: bool) -> CompileResult<()> {
    let return_type = parse_type_keyword(stream)?;
    let opcode_number = parse_u32_literal(stream)?;
    stream.must_punct(":")?;
    let (name, pos) = stream.must_symbol()?;
    stream.must_punct("(")?;

    let mut args = Vec::new();
    let mut min_args = 0usize;
    let mut seen_default = false;
    if !stream.peek().kind.is_punct(")") {
        loop {
            let arg_ty = parse_type_keyword(stream)?;
            let (arg_name, arg_pos) = stream.must_symbol()?;

            let default = if stream.consume_punct("=") {
                if arg_ty == DataType::Str {
                    return Err(CompileError::at(ErrorKind::Type, arg_pos, "string-typed parameters may not have a default value"));
                }
                seen_default = true;
                Some(parse_const_literal(stream, arg_ty)?)
            } else {
                if seen_default {
                    return Err(CompileError::at(ErrorKind::Semantic, arg_pos, "a required argument cannot follow one with a default value"));
                }
                min_args += 1;
                None
            };

            args.push(CommandArg { ty: arg_ty, name: arg_name, default });

            if stream.consume_punct(",") {
                continue;
            }
            break;
        }
    }
    stream.must_punct(")")?;
    stream.must_punct(";")?;

    commands.define(CommandDef { opcode_number, is_builtin, name, return_type, args, min_args }, &pos)
}

fn parse_type_keyword(stream: &mut TokenStream) -> CompileResult<DataType> {
    match stream.peek().kind.clone() {
        TokenKind::Keyword(kw) if DataType::from_keyword(kw).is_some() => {
            stream.advance();
            Ok(DataType::from_keyword(kw).expect("checked above"))
        }
        _ => Err(stream.expected("a type (`int`, `str`, `bool`, or `void`)")),
    }
}

fn parse_u32_literal(stream: &mut TokenStream) -> CompileResult<u32> {
    let pos = stream.peek().pos.clone();
    match stream.peek().kind.clone() {
        TokenKind::Number(n) if n >= 0 => {
            stream.advance();
            Ok(n as u32)
        }
        _ => Err(CompileError::at(ErrorKind::Parse, pos, "expected a non-negative integer literal")),
    }
}

fn parse_const_literal(stream: &mut TokenStream, ty: DataType) -> CompileResult<ConstValue> {
    let pos = stream.peek().pos.clone();
    match stream.peek().kind.clone() {
        TokenKind::Number(n) => {
            stream.advance();
            match ty {
                DataType::Bool => Ok(ConstValue::Bool(n != 0)),
                DataType::Int => Ok(ConstValue::Int(n)),
                _ => Err(type_mismatch(&pos, ty)),
            }
        }
        TokenKind::Keyword("true") if ty == DataType::Bool => {
            stream.advance();
            Ok(ConstValue::Bool(true))
        }
        TokenKind::Keyword("false") if ty == DataType::Bool => {
            stream.advance();
            Ok(ConstValue::Bool(false))
        }
        _ => Err(CompileError::at(ErrorKind::Parse, pos, "expected a literal default value")),
    }
}

fn type_mismatch(pos: &Pos, ty: DataType) -> CompileError {
    CompileError::at(ErrorKind::Type, pos.clone(), format!("default value does not match declared type `{}`", ty.name()))
}
