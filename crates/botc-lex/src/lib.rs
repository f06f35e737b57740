//! botc-lex — the byte scanner and token stream (spec §4.1/§4.2, components
//! C1 and C2).
//!
//! [`scanner::Scanner`] turns one file's bytes into tokens; [`stream::TokenStream`]
//! drives a scanner per file, splices in `#include`d files (detecting
//! recursive includes), and runs the brace-insertion pass that lets
//! `botc-par` assume every `if`/`while`/`for`/`else` body is already
//! wrapped in `{ }` by the time parsing starts.

pub mod scanner;
pub mod stream;
pub mod token;

pub use scanner::Scanner;
pub use stream::TokenStream;
pub use token::{Token, TokenKind, KEYWORDS, PUNCTUATION};
