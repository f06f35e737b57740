//! Top-level and in-state declarations (spec §4.6 "Top-level forms",
//! "Inside a state", "Variable declaration").

use botc_isa::{limits, Opcode};
use botc_sym::{DataType, Variable, Writability};
use botc_util::{CompileError, CompileResult, ErrorKind};

use crate::mode::ModeKind;
use crate::scope::{mode_for_block_keyword, ScopeKind};
use crate::stmt::parse_stmt_list;
use crate::Parser;

/// `true` if the current token could start a variable declaration: an
/// optional `const`/`constexpr` modifier followed by a base type keyword.
pub(crate) fn peek_starts_decl(p: &Parser) -> bool {
    let tok = p.stream.peek().kind.clone();
    if tok.is_keyword("const") || tok.is_keyword("constexpr") {
        return true;
    }
    matches!(tok, botc_lex::TokenKind::Keyword("int") | botc_lex::TokenKind::Keyword("str") | botc_lex::TokenKind::Keyword("bool"))
}

fn consume_const_modifier(p: &mut Parser) -> bool {
    p.stream.consume_keyword("const") || p.stream.consume_keyword("constexpr")
}

/// `state NAME ;` or `state NAME { ... }` (spec §4.6 "Top-level forms").
pub(crate) fn parse_state(p: &mut Parser) -> CompileResult<()> {
    p.stream.must_keyword("state")?;
    let (name, pos) = p.stream.must_symbol()?;

    if p.stream.consume_punct(";") {
        p.states.forward_declare(&name, &pos)?;
        return Ok(());
    }

    p.states.define(&name, &pos)?;
    let index = p.states.lookup(&name).expect("just defined").index;
    p.current_state = name.clone();

    p.main_buf.write_header(Opcode::StateName);
    p.main_buf.write_string(&name);
    p.main_buf.write_header(Opcode::StateIndex);
    p.main_buf.write_u32(index);

    p.mode.push(ModeKind::State);
    p.scopes.push(ScopeKind::State);

    p.stream.must_punct("{")?;
    loop {
        if p.stream.consume_punct("}") {
            break;
        }
        parse_in_state_item(p)?;
    }

    p.scopes.pop()?;
    p.mode.pop();
    p.close_state();
    Ok(())
}

/// `event NAME { ... }`, `mainloop { ... }`, `onenter { ... }`,
/// `onexit { ... }`, a variable declaration, or a closing `}` (handled by
/// the caller).
fn parse_in_state_item(p: &mut Parser) -> CompileResult<()> {
    if peek_starts_decl(p) {
        let state_name = p.current_state.clone();
        return parse_var_decl(p, state_name);
    }

    let kw = match p.stream.peek().kind.clone() {
        botc_lex::TokenKind::Keyword(k @ ("event" | "mainloop" | "onenter" | "onexit")) => k,
        _ => return Err(p.stream.expected("`event`, `mainloop`, `onenter`, `onexit`, a declaration, or `}`")),
    };
    p.stream.advance();

    let event_number = if kw == "event" {
        let (name, pos) = p.stream.must_symbol()?;
        let def = p
            .events
            .lookup(&name)
            .ok_or_else(|| CompileError::at(ErrorKind::Semantic, pos.clone(), format!("unknown event `{name}`")))?;
        let number = def.number;

        if p.events_in_state >= limits::MAX_EVENTS_PER_STATE as u32 {
            return Err(CompileError::at(
                ErrorKind::Limit,
                pos.clone(),
                format!("more than {} events in one state", limits::MAX_EVENTS_PER_STATE),
            ));
        }
        p.events_in_state += 1;

        // spec §6: "64 stored events" — each compiled event handler is a
        // handler the runtime has to keep around, counted across the whole
        // program rather than reset per state like `events_in_state`.
        if p.total_events >= limits::MAX_STORED_EVENTS as u32 {
            return Err(CompileError::at(
                ErrorKind::Limit,
                pos.clone(),
                format!("more than {} event handlers in the whole program", limits::MAX_STORED_EVENTS),
            ));
        }
        p.total_events += 1;

        Some(number)
    } else {
        None
    };

    let mode = mode_for_block_keyword(kw).expect("matched one of the four block keywords");
    if kw == "mainloop" {
        if p.mainloop_declared {
            return Err(p.stream.expected("only one `mainloop` per state"));
        }
        p.mainloop_declared = true;
    }

    p.stream.must_punct("{")?;

    let (begin, end) = match kw {
        "event" => (Opcode::Event, Opcode::EndEvent),
        "mainloop" => (Opcode::MainLoop, Opcode::EndMainLoop),
        "onenter" => (Opcode::OnEnter, Opcode::EndOnEnter),
        "onexit" => (Opcode::OnExit, Opcode::EndOnExit),
        _ => unreachable!("matched above"),
    };

    p.mode.push(mode);
    {
        let buf = p.emit_buffer();
        buf.write_header(begin);
        if let Some(n) = event_number {
            buf.write_u32(n);
        }
    }

    p.scopes.push(ScopeKind::Unknown);
    parse_stmt_list(p, "}")?;
    p.scopes.pop()?;

    p.emit_buffer().write_header(end);
    p.mode.pop();
    Ok(())
}

/// `[const|constexpr] TYPE [const|constexpr] NAME [ [ ] ] [= EXPR] ;`
/// (spec §4.6 "Variable declaration"). `const`/`constexpr` both land on
/// [`botc_sym::Writability::Constexpr`]: the grammar only ever describes
/// one erased, inlined-value const form (the initializer must itself be
/// constexpr), so both modifier spellings are accepted as the same rule.
pub(crate) fn parse_var_decl(p: &mut Parser, owning_state: String) -> CompileResult<()> {
    let mut const_count = 0u32;
    if consume_const_modifier(p) {
        const_count += 1;
    }

    let pos = p.stream.peek().pos.clone();
    let ty = match p.stream.peek().kind.clone() {
        botc_lex::TokenKind::Keyword(kw @ ("int" | "str" | "bool")) => {
            p.stream.advance();
            DataType::from_keyword(kw).expect("matched a type keyword")
        }
        _ => return Err(p.stream.expected("a type (`int`, `str`, or `bool`)")),
    };

    if consume_const_modifier(p) {
        const_count += 1;
        if const_count > 1 {
            return Err(CompileError::at(ErrorKind::Parse, pos.clone(), "duplicate `const`/`constexpr` modifier"));
        }
    }

    let (name, name_pos) = p.stream.must_symbol()?;

    let mut is_array = false;
    if p.stream.consume_punct("[") {
        p.stream.must_punct("]")?;
        is_array = true;
        if const_count > 0 {
            return Err(CompileError::at(ErrorKind::Semantic, name_pos.clone(), "array declarations may not be `const`"));
        }
        if !owning_state.is_empty() {
            return Err(CompileError::at(
                ErrorKind::Semantic,
                name_pos.clone(),
                "array variables must be global; state-local arrays are not supported",
            ));
        }
    }

    let is_global = owning_state.is_empty();

    if const_count > 0 {
        p.stream.must_punct("=")?;
        let mut ctx = crate::eval_ctx(&mut *p.strings, p.commands, &p.scopes);
        let val = botc_eval::evaluate(p.stream, ty, &mut ctx)?;
        if !val.is_const() {
            return Err(CompileError::at(ErrorKind::Semantic, name_pos.clone(), "`const` initializer must be a compile-time constant"));
        }
        p.stream.must_punct(";")?;
        let const_value = match (val, ty) {
            (botc_eval::Val::Int(n), DataType::Bool) => botc_sym::ConstValue::Bool(n != 0),
            (botc_eval::Val::Int(n), _) => botc_sym::ConstValue::Int(n),
            (botc_eval::Val::Str(i), _) => botc_sym::ConstValue::StrIndex(i),
            (botc_eval::Val::Buf(_), _) => unreachable!("just checked is_const()"),
        };
        let var = Variable {
            name,
            owning_state,
            ty,
            writability: Writability::Constexpr,
            is_array: false,
            index: None,
            origin: name_pos.clone(),
            const_value: Some(const_value),
        };
        p.scopes.declare(var, &name_pos)?;
        return Ok(());
    }

    p.stream.must_punct(";")?;

    let index = if is_array {
        let idx = p.next_global_array;
        if idx as usize >= limits::MAX_GLOBAL_ARRAYS {
            return Err(CompileError::at(ErrorKind::Limit, name_pos.clone(), format!("more than {} global arrays", limits::MAX_GLOBAL_ARRAYS)));
        }
        p.next_global_array += 1;
        idx
    } else if is_global {
        let frame = p.scopes.top_mut();
        let idx = frame.next_global;
        if idx as usize >= limits::MAX_GLOBAL_VARS {
            return Err(CompileError::at(ErrorKind::Limit, name_pos.clone(), format!("more than {} global variables", limits::MAX_GLOBAL_VARS)));
        }
        frame.next_global += 1;
        idx
    } else {
        let frame = p.scopes.top_mut();
        let idx = frame.next_local;
        if idx as usize >= limits::MAX_STATE_LOCAL_VARS {
            return Err(CompileError::at(ErrorKind::Limit, name_pos.clone(), format!("more than {} state-local variables", limits::MAX_STATE_LOCAL_VARS)));
        }
        frame.next_local += 1;
        idx
    };

    let var = Variable {
        name,
        owning_state,
        ty,
        writability: Writability::Mutable,
        is_array,
        index: Some(index),
        origin: name_pos.clone(),
        const_value: None,
    };
    p.scopes.declare(var, &name_pos)?;
    Ok(())
}
