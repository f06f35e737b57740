//! The parser's scope stack (spec §3 "Parser scope frame", §4.6, §9).
//!
//! Mode says *where* an emission goes; scope says *what control-flow frame
//! am I nested in* and *which variables are visible*. Every `{` that opens
//! a control-flow body pushes a frame inheriting its variable-index bases
//! from the parent; the matching `}` pops it and drops its variables.
//!
//! None of `if`/`while`/`for`/`do`/`switch` redirect emission on their own
//! — they're all transparent to [`crate::Parser::emit_buffer`], which
//! resolves purely from the mode stack. `switch` is handled as a
//! single-buffer, two-pass construct (`stmt::parse_switch`) specifically so
//! a `break` inside a case can reference the switch's own end mark without
//! ever needing a reference in one buffer to target a mark owned by
//! another — see that function's header comment.

use indexmap::IndexMap;

use botc_buf::{DataBuffer, MarkId};
use botc_eval::VarLookup;
use botc_sym::Variable;
use botc_util::{CompileError, CompileResult, ErrorKind, Pos};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Top,
    State,
    If,
    Else,
    While,
    For,
    Do,
    Switch,
    /// A bare `{ }` block with no control-flow role of its own (an
    /// `event`/`mainloop`/`onenter`/`onexit` body, say).
    Unknown,
}

pub struct ScopeFrame {
    pub kind: ScopeKind,
    /// `if`/`switch`: end-of-block mark. `while`/`for`/`do`: loop-entry mark.
    pub mark1: Option<MarkId>,
    /// `while`/`for`: loop-exit mark. `if` with a trailing `else`: the
    /// else's own end-of-block mark (kept separate from the `if`'s `mark1`).
    pub mark2: Option<MarkId>,
    /// `for`'s buffered increment clause, parsed before the loop body but
    /// emitted after it (spec §3: "secondary buffer").
    pub secondary: Option<DataBuffer>,
    pub next_global: u32,
    pub next_local: u32,
    vars: IndexMap<String, Variable>,
}

impl ScopeFrame {
    pub fn new(kind: ScopeKind, next_global: u32, next_local: u32) -> Self {
        Self { kind, mark1: None, mark2: None, secondary: None, next_global, next_local, vars: IndexMap::new() }
    }
}

pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self { frames: vec![ScopeFrame::new(ScopeKind::Top, 0, 0)] }
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(&self) -> &ScopeFrame {
        self.frames.last().expect("scope stack is never empty")
    }

    pub fn top_mut(&mut self) -> &mut ScopeFrame {
        self.frames.last_mut().expect("scope stack is never empty")
    }

    pub fn push(&mut self, kind: ScopeKind) {
        let (g, l) = {
            let top = self.top();
            (top.next_global, top.next_local)
        };
        self.frames.push(ScopeFrame::new(kind, g, l));
    }

    pub fn pop(&mut self) -> CompileResult<ScopeFrame> {
        if self.frames.len() <= 1 {
            return Err(CompileError::new(ErrorKind::Parse, "unbalanced `}`: no scope to close"));
        }
        Ok(self.frames.pop().expect("checked non-empty above"))
    }

    /// Declares a variable in the innermost frame. Errors on a name already
    /// declared in *this* frame (spec §4.3: "name collisions within a
    /// single scope are errors"); shadowing an outer frame's variable is
    /// allowed.
    pub fn declare(&mut self, var: Variable, pos: &Pos) -> CompileResult<()> {
        let frame = self.top_mut();
        if frame.vars.contains_key(&var.name) {
            return Err(CompileError::at(ErrorKind::Parse, pos.clone(), format!("`{}` is already declared in this scope", var.name)));
        }
        frame.vars.insert(var.name.clone(), var);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.frames.iter().rev().find_map(|f| f.vars.get(name))
    }

    /// The mark a `break` inside this frame's kind should jump to, if this
    /// kind is a legal break target at all (spec §4.6: "innermost enclosing
    /// switch/if end (M1) or loop end (M2)" — `do` has no exit mark of its
    /// own, so it's transparent to `break` the same way `Unknown` is).
    fn break_mark(frame: &ScopeFrame) -> Option<MarkId> {
        match frame.kind {
            ScopeKind::If | ScopeKind::Switch => frame.mark1,
            ScopeKind::Else | ScopeKind::While | ScopeKind::For => frame.mark2,
            _ => None,
        }
    }

    pub fn innermost_break_target(&self) -> Option<MarkId> {
        self.frames.iter().rev().find_map(Self::break_mark)
    }

    /// `continue` only ever targets a loop's entry mark (spec §4.6: "scans
    /// frames outward for the innermost loop (`for`/`while`/`do`)").
    pub fn innermost_continue_target(&self) -> Option<MarkId> {
        self.frames
            .iter()
            .rev()
            .find(|f| matches!(f.kind, ScopeKind::While | ScopeKind::For | ScopeKind::Do))
            .and_then(|f| f.mark1)
    }
}

impl VarLookup for ScopeStack {
    fn lookup(&self, name: &str) -> Option<&Variable> {
        ScopeStack::lookup(self, name)
    }
}

/// Which [`crate::mode::ModeKind`] a `state`-body block keyword switches to,
/// or `None` if `keyword` isn't one of the four.
pub fn mode_for_block_keyword(keyword: &str) -> Option<crate::mode::ModeKind> {
    use crate::mode::ModeKind;
    match keyword {
        "event" => Some(ModeKind::Event),
        "mainloop" => Some(ModeKind::MainLoop),
        "onenter" => Some(ModeKind::OnEnter),
        "onexit" => Some(ModeKind::OnExit),
        _ => None,
    }
}
