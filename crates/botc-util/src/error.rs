//! The single fatal error type shared by every compilation stage.
//!
//! spec §7 is explicit that all errors are fatal and that there is no
//! recovery: a `CompileError` is produced, propagated with `?` straight up
//! to the driver, and printed once. The `kind` field exists only to give
//! tests and `--verbose` output a stable tag to match on; it never drives
//! branching in the compiler itself.

use std::fmt;
use std::path::PathBuf;

use crate::pos::Pos;

/// Coarse classification from spec §7. Not used for recovery — only for
/// diagnostics and tests that want to assert "this failed for the right
/// reason" without string-matching the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Preprocess,
    Parse,
    Type,
    Semantic,
    Limit,
    Arithmetic,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Lex => "lex",
            ErrorKind::Preprocess => "preprocess",
            ErrorKind::Parse => "parse",
            ErrorKind::Type => "type",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Limit => "limit",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// A fatal compiler error, optionally carrying a source position.
///
/// When a position is present, `Display` renders the `file:line:column`
/// prefix spec §7 requires ("a single error type carries a message and
/// (when a lexer is active) a `file:line:column` prefix added
/// automatically"). The `file:line:column` prefix is conditional on
/// `pos`, which thiserror's `#[error("...")]` format strings can't express,
/// so `Display`/`Error` are implemented by hand rather than derived.
#[derive(Debug)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: Option<Pos>,
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), pos: None }
    }

    pub fn at(kind: ErrorKind, pos: Pos, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), pos: Some(pos) }
    }

    pub fn io(path: &PathBuf, source: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("{}: {}", path.display(), source))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{}: {}", pos, self.message),
            None => f.write_str(&self.message),
        }
    }
}

pub type CompileResult<T> = std::result::Result<T, CompileError>;
