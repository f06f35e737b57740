//! The parser's mode stack (spec §4.6, §9 "Mode and scope stacks").
//!
//! Mode answers one question only: which of the three long-lived buffers
//! (main, on-enter, main-loop) does an emission go into right now? Control
//! flow (`if`/`while`/`switch`/…) never changes the mode — only the five
//! block keywords that can appear directly inside a `state` body do.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeKind {
    Top,
    State,
    Event,
    MainLoop,
    OnEnter,
    OnExit,
}

/// Always has `Top` at the bottom; never empty.
#[derive(Debug)]
pub struct ModeStack {
    frames: Vec<ModeKind>,
}

impl Default for ModeStack {
    fn default() -> Self {
        Self { frames: vec![ModeKind::Top] }
    }
}

impl ModeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(&self) -> ModeKind {
        *self.frames.last().expect("mode stack is never empty")
    }

    pub fn push(&mut self, kind: ModeKind) {
        self.frames.push(kind);
    }

    /// Pops the top frame; panics if it would empty the stack, since the
    /// bottom `Top` frame is never popped by a matching `}` (there's no
    /// outer `{` that pushed it).
    pub fn pop(&mut self) {
        assert!(self.frames.len() > 1, "cannot pop the bottom `top` mode frame");
        self.frames.pop();
    }

    pub fn is_at_top(&self) -> bool {
        self.frames.len() == 1
    }
}
