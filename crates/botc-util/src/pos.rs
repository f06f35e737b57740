//! Source positions.
//!
//! Every token, mark, and diagnostic in `botc` traces back to a `Pos`: the
//! originating file, plus a 1-based line and column. Positions are cheap to
//! copy and carry no borrow on the source text, so they can be stashed on
//! long-lived records (a `Variable`'s origin token, say) without fighting
//! the borrow checker.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A source file's path, reference-counted so every `Pos` pointing into it
/// can hold a cheap clone rather than an index into a table the rest of the
/// crate would need to thread through every signature. `Arc` rather than
/// `Rc`: `CompileError` carries an optional `Pos` and crosses the
/// `anyhow::Context` boundary in `botc-drv`, which requires `Send + Sync`.
pub type FileName = Arc<PathBuf>;

/// A single point in a source file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub file: FileName,
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(file: FileName, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// A placeholder position for synthetic tokens that have no real
    /// origin (the end-of-source sentinel, for instance).
    pub fn synthetic(file: FileName) -> Self {
        Self { file, line: 0, column: 0 }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Tracks line/column as bytes are consumed, recognizing LF, CR, and the
/// CRLF/LFCR pairs as a single line break (spec §4.1).
#[derive(Debug)]
pub struct LineTracker {
    file: FileName,
    line: u32,
    column: u32,
    last_was_cr_or_lf: Option<u8>,
}

impl LineTracker {
    pub fn new(file: FileName) -> Self {
        Self { file, line: 1, column: 1, last_was_cr_or_lf: None }
    }

    pub fn pos(&self) -> Pos {
        Pos::new(self.file.clone(), self.line, self.column)
    }

    /// Advances past one consumed byte, returning whether it completed a
    /// CRLF/LFCR pair (the caller should skip counting the paired byte
    /// itself as a second newline).
    pub fn advance(&mut self, byte: u8) {
        match byte {
            b'\n' | b'\r' => {
                if let Some(prev) = self.last_was_cr_or_lf {
                    if (prev == b'\r' && byte == b'\n') || (prev == b'\n' && byte == b'\r') {
                        // Second half of a CRLF/LFCR pair: already counted.
                        self.last_was_cr_or_lf = None;
                        self.column = 1;
                        return;
                    }
                }
                self.line += 1;
                self.column = 1;
                self.last_was_cr_or_lf = Some(byte);
            }
            _ => {
                self.column += 1;
                self.last_was_cr_or_lf = None;
            }
        }
    }
}

pub fn file_name(path: impl AsRef<Path>) -> FileName {
    Arc::new(path.as_ref().to_path_buf())
}
