//! Fuzz target for the RWLZ lexer.
//!
//! Any input must lex to a token stream ending in exactly one `Eof`, with
//! malformed text reported as diagnostics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rwlzc::{Lexer, TokenKind};

fuzz_target!(|data: &str| {
    let mut lexer = Lexer::new(data);
    let tokens: Vec<_> = lexer.by_ref().collect();

    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(), 1);
    for token in &tokens {
        assert!(token.span.start <= token.span.end);
        assert!(token.span.end <= data.len());
    }
    let _ = lexer.take_diagnostics();
});
