//! botc-par — the recursive-descent parser (spec §4.6, component C6).
//!
//! Drives the token stream directly: there is no separate AST. Every
//! grammar rule either declares something into a symbol table (`botc-sym`),
//! pushes/pops the mode or scope stack, or emits straight into whichever
//! [`DataBuffer`] [`Parser::emit_buffer`] currently resolves to. `botc-eval`
//! does the same for expressions; this crate's statement and declaration
//! forms are the part of the grammar the evaluator doesn't own.

pub mod decl;
pub mod defs;
pub mod mode;
pub mod scope;
pub mod stmt;

use botc_buf::DataBuffer;
use botc_isa::Opcode;
use botc_lex::TokenStream;
use botc_sym::{CommandTable, EventTable, StateTable, StringPool};
use botc_util::{CompileError, CompileResult, ErrorKind};

use mode::{ModeKind, ModeStack};
use scope::ScopeStack;

/// Builds an [`botc_eval::EvalCtx`] from disjoint field borrows rather than
/// `&mut Parser`. A method taking `&mut self` would tie up the whole
/// `Parser` for the evaluator's lifetime, and every call site needs
/// `p.stream` free in the same breath to actually drive the evaluator —
/// so this takes exactly the three fields it needs and nothing else.
pub(crate) fn eval_ctx<'a>(
    strings: &'a mut StringPool,
    commands: &'a CommandTable,
    scopes: &'a ScopeStack,
) -> botc_eval::EvalCtx<'a> {
    botc_eval::EvalCtx { strings, commands, vars: scopes }
}

/// One state's fully merged bytecode: `StateName`, `StateIndex`, the main
/// buffer (event blocks and top-level declarations included), then the
/// concatenated on-enter and main-loop buffers (spec §4.6 end-of-source,
/// §4.7 per-state layout).
pub struct StateSegment {
    pub buf: DataBuffer,
}

/// Everything `botc-obj` needs: the per-state segments in declaration
/// order, plus the string pool to write as the trailing segment.
pub struct CompileOutput {
    pub states: Vec<StateSegment>,
}

pub struct Parser<'a> {
    pub(crate) stream: &'a mut TokenStream,
    pub(crate) mode: ModeStack,
    pub(crate) scopes: ScopeStack,
    pub(crate) states: &'a mut StateTable,
    pub(crate) events: &'a mut EventTable,
    pub(crate) commands: &'a CommandTable,
    pub(crate) strings: &'a mut StringPool,

    pub(crate) current_state: String,
    pub(crate) main_buf: DataBuffer,
    pub(crate) onenter_buf: DataBuffer,
    pub(crate) mainloop_buf: DataBuffer,
    pub(crate) mainloop_declared: bool,
    pub(crate) events_in_state: u32,
    pub(crate) total_events: u32,
    pub(crate) next_global_array: u32,

    segments: Vec<StateSegment>,
}

impl<'a> Parser<'a> {
    pub fn new(
        stream: &'a mut TokenStream,
        states: &'a mut StateTable,
        events: &'a mut EventTable,
        commands: &'a CommandTable,
        strings: &'a mut StringPool,
    ) -> Self {
        Self {
            stream,
            mode: ModeStack::new(),
            scopes: ScopeStack::new(),
            states,
            events,
            commands,
            strings,
            current_state: String::new(),
            main_buf: DataBuffer::new(),
            onenter_buf: DataBuffer::new(),
            mainloop_buf: DataBuffer::new(),
            mainloop_declared: false,
            events_in_state: 0,
            total_events: 0,
            next_global_array: 0,
            segments: Vec::new(),
        }
    }

    /// spec §4.6: "the current emission buffer is selected by the top
    /// [mode] frame" — control-flow scopes (`if`/`while`/`switch`/…) are all
    /// transparent to this; only the five `state`-body block keywords ever
    /// change which buffer is live.
    pub(crate) fn emit_buffer(&mut self) -> &mut DataBuffer {
        match self.mode.top() {
            ModeKind::MainLoop => &mut self.mainloop_buf,
            ModeKind::OnEnter => &mut self.onenter_buf,
            _ => &mut self.main_buf,
        }
    }

    fn run(&mut self) -> CompileResult<()> {
        while !self.stream.is_eof() {
            self.parse_top_level_item()?;
        }
        if !self.mode.is_at_top() {
            return Err(CompileError::new(ErrorKind::Parse, "unterminated scope at end of file"));
        }
        self.states.check_spawn_state_defined()?;
        Ok(())
    }

    fn parse_top_level_item(&mut self) -> CompileResult<()> {
        if self.stream.peek().kind.is_keyword("state") {
            return decl::parse_state(self);
        }
        if decl::peek_starts_decl(self) {
            return decl::parse_var_decl(self, String::new());
        }
        Err(self.stream.expected("`state` or a variable declaration"))
    }

    /// Folds the per-state buffers into one segment (spec §4.6 end-of-source,
    /// §4.7): a state that never declared a `mainloop` still gets an empty
    /// synthetic one, so every state's segment has the same tail shape.
    pub(crate) fn close_state(&mut self) {
        if !self.mainloop_declared {
            self.mainloop_buf.write_header(Opcode::MainLoop);
            self.mainloop_buf.write_header(Opcode::EndMainLoop);
        }
        let mut merged = std::mem::take(&mut self.main_buf);
        merged.merge(std::mem::take(&mut self.onenter_buf));
        merged.merge(std::mem::take(&mut self.mainloop_buf));
        self.segments.push(StateSegment { buf: merged });
        self.mainloop_declared = false;
        self.events_in_state = 0;
    }

    fn finish(self) -> CompileOutput {
        CompileOutput { states: self.segments }
    }
}

/// Runs the parser over a fully preprocessed token stream, declaring into
/// the shared `botc-sym` tables as it goes.
pub fn compile(
    stream: &mut TokenStream,
    states: &mut StateTable,
    events: &mut EventTable,
    commands: &CommandTable,
    strings: &mut StringPool,
) -> CompileResult<CompileOutput> {
    let mut parser = Parser::new(stream, states, events, commands, strings);
    parser.run()?;
    Ok(parser.finish())
}
