//! Lexical scopes and the symbol table.
//!
//! Scopes live in an arena and refer to each other by [`ScopeId`]. Each scope
//! keeps its parent handle and the handles of the scopes opened inside it,
//! so the full tree survives analysis and can be dumped afterwards.
//!
//! Functions are global: they are stored once for the whole table and are
//! found from any scope. Variables are lexical and shadow outer bindings.

use std::fmt::{self, Write as _};

use crate::ast::FunctionKind;
use crate::typeck::ty::{BaseType, ResolvedType};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Handle to a scope in a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The global scope.
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    /// Parameters of one function.
    Function,
    Block,
    /// The header of a `for` loop.
    Loop,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeKind::Global => "global",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
            ScopeKind::Loop => "loop",
        })
    }
}

/// A variable or parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: ResolvedType,
    pub is_const: bool,
    pub is_initialized: bool,
    pub is_used: bool,
    pub is_parameter: bool,
    /// Line of the definition.
    pub line: u32,
}

impl Symbol {
    pub fn variable(name: impl Into<String>, ty: ResolvedType, line: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            is_const: ty.is_const,
            is_initialized: false,
            is_used: false,
            is_parameter: false,
            line,
        }
    }

    pub fn parameter(name: impl Into<String>, ty: ResolvedType, line: u32) -> Self {
        Self {
            is_initialized: true,
            is_parameter: true,
            ..Self::variable(name, ty, line)
        }
    }
}

/// A function signature registered in the global scope.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbol {
    pub name: String,
    pub param_types: Vec<ResolvedType>,
    pub param_names: Vec<String>,
    pub return_type: ResolvedType,
    pub kind: FunctionKind,
    pub is_builtin: bool,
    pub is_used: bool,
    pub line: u32,
}

impl FunctionSymbol {
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }
}

impl fmt::Display for FunctionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind != FunctionKind::Normal {
            write!(f, "<{}> ", self.kind)?;
        }
        write!(f, "{}(", self.name)?;
        for (i, (ty, name)) in self.param_types.iter().zip(&self.param_names).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty} {name}")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// One lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Label for dumps, e.g. the function name.
    pub name: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Symbols in definition order.
    symbols: Vec<Symbol>,
    index: FxHashMap<String, usize>,
}

impl Scope {
    fn new(kind: ScopeKind, name: String, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            name,
            parent,
            children: Vec::new(),
            symbols: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    /// Symbols in definition order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("cannot exit the global scope")]
    ExitRoot,
}

/// The scope tree plus the global function table.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
    functions: Vec<FunctionSymbol>,
    function_index: FxHashMap<String, usize>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding only the global scope and the builtin functions.
    pub fn new() -> Self {
        let mut table = Self {
            scopes: vec![Scope::new(ScopeKind::Global, "global".to_string(), None)],
            current: ScopeId::ROOT,
            functions: Vec::new(),
            function_index: FxHashMap::default(),
        };
        table.define_function(FunctionSymbol {
            name: "print".to_string(),
            param_types: vec![ResolvedType::scalar(BaseType::String)],
            param_names: vec!["value".to_string()],
            return_type: ResolvedType::VOID,
            kind: FunctionKind::Normal,
            is_builtin: true,
            is_used: false,
            line: 0,
        });
        table
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Every scope in creation order.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Nesting depth of the current scope; the global scope is 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.scope(self.current).parent;
        while let Some(id) = scope {
            depth += 1;
            scope = self.scope(id).parent;
        }
        depth
    }

    /// Open a child of the current scope and make it current.
    pub fn enter_scope(&mut self, kind: ScopeKind, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, name.into(), Some(self.current)));
        self.scopes[self.current.index()].children.push(id);
        self.current = id;
        id
    }

    /// Return to the parent of the current scope.
    pub fn exit_scope(&mut self) -> Result<ScopeId, ScopeError> {
        let parent = self.scope(self.current).parent.ok_or(ScopeError::ExitRoot)?;
        self.current = parent;
        Ok(parent)
    }

    /// Define a symbol in the current scope.
    ///
    /// Returns `false`, leaving the table unchanged, if the name is already
    /// defined in the current scope. Outer definitions are shadowed.
    pub fn define(&mut self, symbol: Symbol) -> bool {
        let scope = &mut self.scopes[self.current.index()];
        if scope.index.contains_key(&symbol.name) {
            return false;
        }
        scope.index.insert(symbol.name.clone(), scope.symbols.len());
        scope.symbols.push(symbol);
        true
    }

    /// Find a variable, innermost scope first.
    pub fn lookup(&self, name: &str, current_only: bool) -> Option<&Symbol> {
        let id = self.find(name, current_only)?;
        self.scope(id).get(name)
    }

    /// Find a variable for updating its flags.
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        let id = self.find(name, false)?;
        let scope = &mut self.scopes[id.index()];
        let &i = scope.index.get(name)?;
        Some(&mut scope.symbols[i])
    }

    fn find(&self, name: &str, current_only: bool) -> Option<ScopeId> {
        let mut id = Some(self.current);
        while let Some(scope_id) = id {
            let scope = self.scope(scope_id);
            if scope.index.contains_key(name) {
                return Some(scope_id);
            }
            if current_only {
                return None;
            }
            id = scope.parent;
        }
        None
    }

    /// Register a function globally. Returns `false` if the name is taken.
    pub fn define_function(&mut self, function: FunctionSymbol) -> bool {
        if self.function_index.contains_key(&function.name) {
            return false;
        }
        self.function_index
            .insert(function.name.clone(), self.functions.len());
        self.functions.push(function);
        true
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.function_index.get(name).map(|&i| &self.functions[i])
    }

    pub fn lookup_function_mut(&mut self, name: &str) -> Option<&mut FunctionSymbol> {
        let &i = self.function_index.get(name)?;
        Some(&mut self.functions[i])
    }

    /// Functions in registration order, builtins first.
    pub fn functions(&self) -> &[FunctionSymbol] {
        &self.functions
    }

    /// Render the scope tree with every symbol and its flags.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_scope(ScopeId::ROOT, 0, &mut out);
        out
    }

    fn dump_scope(&self, id: ScopeId, level: usize, out: &mut String) {
        let scope = self.scope(id);
        let indent = "  ".repeat(level);
        let _ = writeln!(out, "{indent}{} '{}'", scope.kind, scope.name);

        if id == ScopeId::ROOT {
            for function in &self.functions {
                let mut flags = Vec::new();
                if function.is_builtin {
                    flags.push("builtin");
                }
                if function.is_used {
                    flags.push("used");
                }
                let _ = write!(out, "{indent}  fn {function}");
                write_flags(out, &flags, function.line);
            }
        }

        for symbol in &scope.symbols {
            let mut flags = Vec::new();
            if symbol.is_parameter {
                flags.push("param");
            }
            if symbol.is_initialized {
                flags.push("initialized");
            }
            if symbol.is_used {
                flags.push("used");
            }
            let _ = write!(out, "{indent}  {} {}", symbol.ty, symbol.name);
            write_flags(out, &flags, symbol.line);
        }

        for &child in &scope.children {
            self.dump_scope(child, level + 1, out);
        }
    }
}

fn write_flags(out: &mut String, flags: &[&str], line: u32) {
    if !flags.is_empty() {
        let _ = write!(out, " [{}]", flags.join(", "));
    }
    if line > 0 {
        let _ = write!(out, " (line {line})");
    }
    out.push('\n');
}
