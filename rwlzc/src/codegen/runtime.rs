//! Runtime support for RWLZ programs.
//!
//! Generated code calls a fixed set of C library functions. All of them are
//! declared in every module, and the C library supplies them at link time.

use crate::codegen::ir::{Declaration, FnSig, IrType};

/// A C library function the generator may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    Printf,
    Sprintf,
    Strlen,
    Strcpy,
    Strcat,
    Strcmp,
    Malloc,
}

impl RuntimeFn {
    pub const ALL: [RuntimeFn; 7] = [
        RuntimeFn::Printf,
        RuntimeFn::Sprintf,
        RuntimeFn::Strlen,
        RuntimeFn::Strcpy,
        RuntimeFn::Strcat,
        RuntimeFn::Strcmp,
        RuntimeFn::Malloc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuntimeFn::Printf => "printf",
            RuntimeFn::Sprintf => "sprintf",
            RuntimeFn::Strlen => "strlen",
            RuntimeFn::Strcpy => "strcpy",
            RuntimeFn::Strcat => "strcat",
            RuntimeFn::Strcmp => "strcmp",
            RuntimeFn::Malloc => "malloc",
        }
    }

    pub fn sig(self) -> FnSig {
        let text = IrType::i8_ptr;
        match self {
            // int printf(const char *fmt, ...)
            RuntimeFn::Printf => FnSig::new(IrType::I32, vec![text()]).variadic(),
            // int sprintf(char *buf, const char *fmt, ...)
            RuntimeFn::Sprintf => FnSig::new(IrType::I32, vec![text(), text()]).variadic(),
            // size_t strlen(const char *s)
            RuntimeFn::Strlen => FnSig::new(IrType::I64, vec![text()]),
            RuntimeFn::Strcpy | RuntimeFn::Strcat => FnSig::new(text(), vec![text(), text()]),
            RuntimeFn::Strcmp => FnSig::new(IrType::I32, vec![text(), text()]),
            // void *malloc(size_t n)
            RuntimeFn::Malloc => FnSig::new(text(), vec![IrType::I64]),
        }
    }

    /// Whether a user function would clash with a runtime symbol.
    pub fn is_reserved(name: &str) -> bool {
        RuntimeFn::ALL.iter().any(|f| f.name() == name)
    }
}

/// Declarations for the whole runtime set, in a stable order.
pub fn declarations() -> Vec<Declaration> {
    RuntimeFn::ALL
        .iter()
        .map(|f| Declaration {
            name: f.name().to_string(),
            sig: f.sig(),
        })
        .collect()
}
