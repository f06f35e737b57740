//! Byte scanner (spec §4.1, component C1).
//!
//! Reads one file fully into memory and exposes a pull-based "next token"
//! iterator over a mutable byte cursor. Knows nothing about `#include` or
//! multi-file token streams — that is `stream.rs`'s job (C2).

use botc_util::{CompileError, CompileResult, ErrorKind, FileName, LineTracker, Pos};

use crate::token::{Token, TokenKind, KEYWORDS, PUNCTUATION};

pub struct Scanner {
    bytes: Vec<u8>,
    pos: usize,
    tracker: LineTracker,
    file: FileName,
}

impl Scanner {
    pub fn new(file: FileName, source: Vec<u8>) -> Self {
        Self { tracker: LineTracker::new(file.clone()), bytes: source, pos: 0, file }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        self.tracker.advance(b);
        Some(b)
    }

    fn cur_pos(&self) -> Pos {
        self.tracker.pos()
    }

    /// Returns the remaining text of the current line, without consuming
    /// it as tokens. Used by the driver for a file-level header check
    /// (e.g. rejecting a BOM or a non-UTF8-clean prelude) before real
    /// tokenization starts.
    pub fn read_line(&self) -> &str {
        let start = self.pos;
        let mut end = start;
        while end < self.bytes.len() && self.bytes[end] != b'\n' && self.bytes[end] != b'\r' {
            end += 1;
        }
        std::str::from_utf8(&self.bytes[start..end]).unwrap_or("")
    }

    fn skip_whitespace_and_comments(&mut self) -> CompileResult<()> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n') | Some(b'\r')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.cur_pos();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(CompileError::at(
                                    ErrorKind::Lex,
                                    start,
                                    "unterminated block comment",
                                ))
                            }
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            _ => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> CompileResult<Token> {
        self.skip_whitespace_and_comments()?;

        let start_pos = self.cur_pos();
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", start_pos));
        };

        if c == b'"' {
            return self.scan_string(start_pos);
        }
        if c.is_ascii_digit() {
            return Ok(self.scan_number(start_pos));
        }
        if is_symbol_start(c) {
            return Ok(self.scan_word(start_pos));
        }
        if let Some(lexeme) = self.match_punctuation() {
            return Ok(Token::new(TokenKind::Punct(lexeme), lexeme, start_pos));
        }

        Err(CompileError::at(
            ErrorKind::Lex,
            start_pos,
            format!("unrecognized character {:?}", c as char),
        ))
    }

    fn match_punctuation(&mut self) -> Option<&'static str> {
        for &lexeme in PUNCTUATION {
            let bytes = lexeme.as_bytes();
            if self.bytes[self.pos..].starts_with(bytes) {
                for _ in 0..bytes.len() {
                    self.bump();
                }
                return Some(lexeme);
            }
        }
        None
    }

    fn scan_string(&mut self, start_pos: Pos) -> CompileResult<Token> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(CompileError::at(ErrorKind::Lex, start_pos, "unterminated string"))
                }
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    match self.bump() {
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        Some(b'"') => value.push('"'),
                        Some(other) => value.push(other as char),
                        None => {
                            return Err(CompileError::at(
                                ErrorKind::Lex,
                                start_pos,
                                "unterminated string",
                            ))
                        }
                    }
                }
                Some(b) => {
                    self.bump();
                    value.push(b as char);
                }
            }
        }
        Ok(Token::new(TokenKind::StringLiteral(value.clone()), value, start_pos))
    }

    fn scan_number(&mut self, start_pos: Pos) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("0").to_string();
        let value: i64 = text.parse().unwrap_or(0);
        Token::new(TokenKind::Number(value), text, start_pos)
    }

    fn scan_word(&mut self, start_pos: Pos) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_symbol_continue(b)) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("").to_string();
        if let Some(&kw) = KEYWORDS.iter().find(|k| **k == text) {
            Token::new(TokenKind::Keyword(kw), text, start_pos)
        } else {
            Token::new(TokenKind::Symbol(text.clone()), text, start_pos)
        }
    }
}

fn is_symbol_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_symbol_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use botc_util::file_name;

    fn tokens_of(src: &str) -> Vec<TokenKind> {
        let mut s = Scanner::new(file_name("test.bts"), src.as_bytes().to_vec());
        let mut out = Vec::new();
        loop {
            let tok = s.next_token().expect("lex ok");
            let done = matches!(tok.kind, TokenKind::Eof);
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_keywords_and_symbols() {
        let toks = tokens_of("if (x) { y = 1; }");
        assert_eq!(
            toks,
            vec![
                TokenKind::Keyword("if"),
                TokenKind::Punct("("),
                TokenKind::Symbol("x".into()),
                TokenKind::Punct(")"),
                TokenKind::Punct("{"),
                TokenKind::Symbol("y".into()),
                TokenKind::Punct("="),
                TokenKind::Number(1),
                TokenKind::Punct(";"),
                TokenKind::Punct("}"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn maximal_munch_prefers_longest_operator() {
        let toks = tokens_of("a <= b && c");
        assert!(toks.contains(&TokenKind::Punct("<=")));
        assert!(toks.contains(&TokenKind::Punct("&&")));
    }

    #[test]
    fn skips_both_comment_styles() {
        let toks = tokens_of("// line\n/* block */ x");
        assert_eq!(toks, vec![TokenKind::Symbol("x".into()), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut s = Scanner::new(file_name("t.bts"), b"\"abc".to_vec());
        assert!(s.next_token().is_err());
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let mut s = Scanner::new(file_name("t.bts"), b"/* abc".to_vec());
        assert!(s.next_token().is_err());
    }
}
