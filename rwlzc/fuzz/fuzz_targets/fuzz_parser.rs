//! Fuzz target for the RWLZ parser.
//!
//! The parser may reject input but must never panic, and a rejection always
//! carries at least one error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rwlzc::Parser;

fuzz_target!(|data: &str| {
    if let Err(errors) = Parser::new(data).parse_program() {
        assert!(!errors.is_empty());
    }
});
