//! Fuzz target for the whole pipeline.
//!
//! Every phase reports problems as values; nothing may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rwlzc::config::CompilerConfig;

fuzz_target!(|data: &str| {
    let compilation = rwlzc::compile(data, &CompilerConfig::default());
    if compilation.module.is_some() {
        assert!(compilation.front_end_succeeded());
        assert!(compilation.codegen_error.is_none());
    }
});
