//! Token stream (spec §4.2, component C2).
//!
//! Drives [`crate::scanner::Scanner`] once per file, stitching `#include`d
//! files' tokens in place (with recursion detection), then runs a single
//! brace-insertion pass over the complete token vector before handing it to
//! the parser. After construction the stream is a flat, randomly
//! addressable cursor: `peek`, `consume_of_kind`, `must_get`, `skip`, and
//! `save`/`restore` for the parser's limited backtracking needs (e.g.
//! distinguishing `state NAME ;` from `state NAME { ... }`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use botc_util::{file_name, CompileError, CompileResult, ErrorKind, Pos};

use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};

pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    /// Reads `entry` (and everything it transitively `#include`s) into one
    /// token vector, then normalizes single-statement control-flow bodies.
    pub fn from_file(entry: impl AsRef<Path>) -> CompileResult<Self> {
        let entry = entry.as_ref().to_path_buf();
        let mut tokens = Vec::new();
        let mut active = HashSet::new();
        expand_file(&entry, &mut active, &mut tokens)?;

        let eof_pos = tokens
            .last()
            .map(|t| t.pos.clone())
            .unwrap_or_else(|| Pos::synthetic(file_name(&entry)));
        tokens.push(Token::new(TokenKind::Eof, "", eof_pos));

        insert_braces(&mut tokens);

        Ok(Self { tokens, pos: 0 })
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        insert_braces(&mut tokens);
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.tokens.len() - 1);
    }

    pub fn save(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// Consumes the next token only if it is the punctuation `lexeme`.
    pub fn consume_punct(&mut self, lexeme: &str) -> bool {
        if self.peek().kind.is_punct(lexeme) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn consume_keyword(&mut self, lexeme: &str) -> bool {
        if self.peek().kind.is_keyword(lexeme) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Fails with a `file:line:column` diagnostic naming the expected kind
    /// if the next token does not match (spec §4.2 "must get kind").
    pub fn must_punct(&mut self, lexeme: &str) -> CompileResult<Token> {
        if self.peek().kind.is_punct(lexeme) {
            Ok(self.advance())
        } else {
            Err(self.expected(format!("`{lexeme}`")))
        }
    }

    pub fn must_keyword(&mut self, lexeme: &str) -> CompileResult<Token> {
        if self.peek().kind.is_keyword(lexeme) {
            Ok(self.advance())
        } else {
            Err(self.expected(format!("keyword `{lexeme}`")))
        }
    }

    pub fn must_symbol(&mut self) -> CompileResult<(String, Pos)> {
        if let TokenKind::Symbol(name) = self.peek().kind.clone() {
            let pos = self.peek().pos.clone();
            self.advance();
            Ok((name, pos))
        } else {
            Err(self.expected("an identifier"))
        }
    }

    pub fn expected(&self, what: impl std::fmt::Display) -> CompileError {
        CompileError::at(
            ErrorKind::Parse,
            self.peek().pos.clone(),
            format!("expected {what}, found {}", self.peek().kind.describe()),
        )
    }
}

fn resolve_include(from: &Path, target: &str) -> PathBuf {
    let base = from.parent().unwrap_or_else(|| Path::new("."));
    base.join(target)
}

fn expand_file(path: &Path, active: &mut HashSet<PathBuf>, out: &mut Vec<Token>) -> CompileResult<()> {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !active.insert(canonical.clone()) {
        return Err(CompileError::new(
            ErrorKind::Preprocess,
            format!("attempted to #include {} recursively", path.display()),
        ));
    }

    let bytes = std::fs::read(path).map_err(|e| CompileError::io(&path.to_path_buf(), e))?;
    let mut scanner = Scanner::new(file_name(path), bytes);
    let mut raw = Vec::new();
    loop {
        let tok = scanner.next_token()?;
        if matches!(tok.kind, TokenKind::Eof) {
            break;
        }
        raw.push(tok);
    }

    let mut i = 0;
    while i < raw.len() {
        if raw[i].kind.is_punct("#")
            && raw.get(i + 1).map(|t| t.kind.as_symbol() == Some("include")).unwrap_or(false)
        {
            let target = match raw.get(i + 2).map(|t| &t.kind) {
                Some(TokenKind::StringLiteral(s)) => s.clone(),
                _ => {
                    return Err(CompileError::at(
                        ErrorKind::Preprocess,
                        raw[i].pos.clone(),
                        "expected a string literal after #include",
                    ))
                }
            };
            let resolved = resolve_include(path, &target);
            expand_file(&resolved, active, out)?;
            i += 3;
        } else if raw[i].kind.is_punct("#") {
            return Err(CompileError::at(
                ErrorKind::Preprocess,
                raw[i].pos.clone(),
                "unknown preprocessor directive",
            ));
        } else {
            out.push(raw[i].clone());
            i += 1;
        }
    }

    active.remove(&canonical);
    Ok(())
}

/// Finds the index one past the end of the single statement that begins
/// at `start` (spec §4.2). Read-only: used both to decide whether a
/// control-flow body already has braces and, when it doesn't, to find
/// where to inject the synthetic closing brace.
fn skip_statement(tokens: &[Token], start: usize) -> usize {
    if start >= tokens.len() {
        return start;
    }
    match &tokens[start].kind {
        TokenKind::Punct("{") => skip_balanced(tokens, start, "{", "}"),
        TokenKind::Keyword("if") => {
            let paren = skip_to_punct(tokens, start + 1, "(");
            let after_cond = skip_balanced(tokens, paren, "(", ")");
            let mut end = skip_statement(tokens, after_cond);
            if tokens.get(end).map(|t| t.kind.is_keyword("else")).unwrap_or(false) {
                end = skip_statement(tokens, end + 1);
            }
            end
        }
        TokenKind::Keyword("while") => {
            let paren = skip_to_punct(tokens, start + 1, "(");
            let after_cond = skip_balanced(tokens, paren, "(", ")");
            skip_statement(tokens, after_cond)
        }
        TokenKind::Keyword("for") => {
            let paren = skip_to_punct(tokens, start + 1, "(");
            let after_clauses = skip_balanced(tokens, paren, "(", ")");
            skip_statement(tokens, after_clauses)
        }
        TokenKind::Keyword("do") => {
            let after_body = skip_statement(tokens, start + 1);
            // after_body should land on `while`; skip its `(...)` and `;`.
            let paren = skip_to_punct(tokens, after_body + 1, "(");
            let after_cond = skip_balanced(tokens, paren, "(", ")");
            if tokens.get(after_cond).map(|t| t.kind.is_punct(";")).unwrap_or(false) {
                after_cond + 1
            } else {
                after_cond
            }
        }
        TokenKind::Keyword("switch") => {
            let paren = skip_to_punct(tokens, start + 1, "(");
            let after_cond = skip_balanced(tokens, paren, "(", ")");
            skip_balanced(tokens, after_cond, "{", "}")
        }
        _ => {
            // A simple statement: scan to the next top-level `;`, tracking
            // nested brackets so a `;` inside e.g. a `for(;;)` header
            // doesn't terminate early.
            let mut i = start;
            let mut depth = 0i32;
            while i < tokens.len() {
                match &tokens[i].kind {
                    TokenKind::Punct("(") | TokenKind::Punct("[") | TokenKind::Punct("{") => depth += 1,
                    TokenKind::Punct(")") | TokenKind::Punct("]") | TokenKind::Punct("}") if depth > 0 => depth -= 1,
                    TokenKind::Punct(")") | TokenKind::Punct("]") | TokenKind::Punct("}") => return i,
                    TokenKind::Punct(";") if depth == 0 => return i + 1,
                    TokenKind::Eof => return i,
                    _ => {}
                }
                i += 1;
            }
            i
        }
    }
}

fn skip_to_punct(tokens: &[Token], mut i: usize, lexeme: &str) -> usize {
    while i < tokens.len() && !tokens[i].kind.is_punct(lexeme) {
        i += 1;
    }
    i
}

/// `i` must point at `open`; returns the index one past the matching `close`.
fn skip_balanced(tokens: &[Token], i: usize, open: &str, close: &str) -> usize {
    let mut depth = 0i32;
    let mut j = i;
    while j < tokens.len() {
        if tokens[j].kind.is_punct(open) {
            depth += 1;
        } else if tokens[j].kind.is_punct(close) {
            depth -= 1;
            if depth == 0 {
                return j + 1;
            }
        }
        j += 1;
    }
    j
}

/// The brace-insertion pass. Collects every needed insertion against the
/// original (unmodified) token vector, then applies them right-to-left so
/// earlier indices stay valid (spec §4.2).
fn insert_braces(tokens: &mut Vec<Token>) {
    let mut insertions: Vec<(usize, Token)> = Vec::new();

    for i in 0..tokens.len() {
        let body_start = match &tokens[i].kind {
            TokenKind::Keyword("if") | TokenKind::Keyword("while") => {
                let paren = skip_to_punct(tokens, i + 1, "(");
                skip_balanced(tokens, paren, "(", ")")
            }
            TokenKind::Keyword("for") => {
                let paren = skip_to_punct(tokens, i + 1, "(");
                skip_balanced(tokens, paren, "(", ")")
            }
            TokenKind::Keyword("else") => i + 1,
            _ => continue,
        };

        if body_start >= tokens.len() || tokens[body_start].kind.is_punct("{") {
            continue;
        }

        let body_end = skip_statement(tokens, body_start);
        insertions.push((
            body_start,
            Token::synthetic_like(&tokens[body_start], TokenKind::Punct("{"), "{"),
        ));
        let close_anchor = &tokens[body_end.saturating_sub(1).min(tokens.len() - 1)];
        insertions.push((body_end, Token::synthetic_like(close_anchor, TokenKind::Punct("}"), "}")));
    }

    insertions.sort_by(|a, b| b.0.cmp(&a.0));
    for (idx, tok) in insertions {
        tokens.insert(idx, tok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_util::file_name;

    fn scan_all(src: &str) -> Vec<Token> {
        let mut s = Scanner::new(file_name("t.bts"), src.as_bytes().to_vec());
        let mut out = Vec::new();
        loop {
            let tok = s.next_token().unwrap();
            if matches!(tok.kind, TokenKind::Eof) {
                out.push(tok);
                break;
            }
            out.push(tok);
        }
        out
    }

    fn lexemes(stream: &TokenStream) -> Vec<String> {
        stream.tokens.iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn wraps_single_statement_if_else() {
        let toks = scan_all("if (x) doA(); else doB();");
        let stream = TokenStream::from_tokens(toks);
        assert_eq!(
            lexemes(&stream),
            vec![
                "if", "(", "x", ")", "{", "doA", "(", ")", ";", "}", "else", "{", "doB", "(", ")", ";",
                "}", "",
            ]
        );
    }

    #[test]
    fn brace_insertion_is_idempotent() {
        let toks = scan_all("if (x) doA(); else if (y) doB(); else doC();");
        let once = TokenStream::from_tokens(toks.clone());
        let twice = TokenStream::from_tokens({
            let mut t = once.tokens.clone();
            // Re-running on already-inserted tokens should be a no-op,
            // since every body already starts with `{`.
            insert_braces(&mut t);
            t
        });
        assert_eq!(once.tokens, twice.tokens);
    }

    #[test]
    fn leaves_already_braced_bodies_alone() {
        let toks = scan_all("if (x) { doA(); }");
        let stream = TokenStream::from_tokens(toks.clone());
        assert_eq!(stream.tokens.len(), toks.len());
    }
}
