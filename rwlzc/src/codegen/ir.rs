//! # Textual IR
//!
//! An in-memory model of the LLVM IR subset the generator emits, rendered
//! through `Display`.
//!
//! ```text
//! Module
//! ├── Global          (@.str.0 = private unnamed_addr constant ...)
//! ├── Declaration     (declare i32 @printf(i8*, ...))
//! └── Function
//!     └── BasicBlock
//!         ├── Vec<Instr>
//!         └── Terminator
//! ```
//!
//! Pointers are typed (`i8*`, `[4 x i32]*`).

use std::fmt;

use rustc_hash::FxHashMap;

// ============================================================================
// Types
// ============================================================================

/// An IR type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    I1,
    I8,
    I32,
    I64,
    Double,
    Ptr(Box<IrType>),
    Array(u32, Box<IrType>),
}

impl IrType {
    /// `i8*`, the representation of strings.
    pub fn i8_ptr() -> IrType {
        IrType::I8.pointer_to()
    }

    pub fn pointer_to(&self) -> IrType {
        IrType::Ptr(Box::new(self.clone()))
    }

    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn array_element(&self) -> Option<&IrType> {
        match self {
            IrType::Array(_, inner) => Some(inner),
            _ => None,
        }
    }

    /// Bit width of an integer type.
    pub fn int_width(&self) -> Option<u32> {
        match self {
            IrType::I1 => Some(1),
            IrType::I8 => Some(8),
            IrType::I32 => Some(32),
            IrType::I64 => Some(64),
            _ => None,
        }
    }

    pub fn is_int(&self) -> bool {
        self.int_width().is_some()
    }

    pub fn is_bool(&self) -> bool {
        *self == IrType::I1
    }

    pub fn is_float(&self) -> bool {
        *self == IrType::Double
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, IrType::Ptr(_))
    }

    pub fn is_string(&self) -> bool {
        *self == IrType::i8_ptr()
    }

    pub fn is_void(&self) -> bool {
        *self == IrType::Void
    }

    /// The zero value of a first-class type.
    pub fn zero(&self) -> Option<Value> {
        match self {
            IrType::I1 | IrType::I8 | IrType::I32 | IrType::I64 => Some(Value::int(self.clone(), 0)),
            IrType::Double => Some(Value::ConstFloat(0.0)),
            IrType::Ptr(_) => Some(Value::Null(self.clone())),
            IrType::Void | IrType::Array(..) => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => f.write_str("void"),
            IrType::I1 => f.write_str("i1"),
            IrType::I8 => f.write_str("i8"),
            IrType::I32 => f.write_str("i32"),
            IrType::I64 => f.write_str("i64"),
            IrType::Double => f.write_str("double"),
            IrType::Ptr(inner) => write!(f, "{inner}*"),
            IrType::Array(len, inner) => write!(f, "[{len} x {inner}]"),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    ConstInt { ty: IrType, value: i64 },
    ConstFloat(f64),
    Null(IrType),
    /// A local register, `%name`.
    Reg { name: String, ty: IrType },
    /// A module-level symbol, `@name`; `ty` is the pointer type.
    Global { name: String, ty: IrType },
}

impl Value {
    pub fn int(ty: IrType, value: i64) -> Value {
        Value::ConstInt { ty, value }
    }

    pub fn i32(value: i64) -> Value {
        Value::int(IrType::I32, value)
    }

    pub fn bool(value: bool) -> Value {
        Value::int(IrType::I1, i64::from(value))
    }

    pub fn ty(&self) -> IrType {
        match self {
            Value::ConstInt { ty, .. } | Value::Null(ty) => ty.clone(),
            Value::ConstFloat(_) => IrType::Double,
            Value::Reg { ty, .. } | Value::Global { ty, .. } => ty.clone(),
        }
    }

    pub fn as_const_int(&self) -> Option<i64> {
        match self {
            Value::ConstInt { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// `i32 %x`
    pub fn typed(&self) -> String {
        format!("{} {}", self.ty(), self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::ConstInt {
                ty: IrType::I1,
                value,
            } => f.write_str(if *value != 0 { "true" } else { "false" }),
            Value::ConstInt { value, .. } => write!(f, "{value}"),
            // Hex keeps every double exact.
            Value::ConstFloat(value) => write!(f, "0x{:016X}", value.to_bits()),
            Value::Null(_) => f.write_str("null"),
            Value::Reg { name, .. } => write!(f, "%{name}"),
            Value::Global { name, .. } => write!(f, "@{name}"),
        }
    }
}

// ============================================================================
// Instructions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::SRem => "srem",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

/// Comparison predicate; rendered as `icmp` or `fcmp` by operand type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Predicate {
    pub fn int_str(self) -> &'static str {
        match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Lt => "slt",
            Predicate::Le => "sle",
            Predicate::Gt => "sgt",
            Predicate::Ge => "sge",
        }
    }

    /// Ordered float predicates.
    pub fn float_str(self) -> &'static str {
        match self {
            Predicate::Eq => "oeq",
            Predicate::Ne => "one",
            Predicate::Lt => "olt",
            Predicate::Le => "ole",
            Predicate::Gt => "ogt",
            Predicate::Ge => "oge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    ZExt,
    SExt,
    Trunc,
    SIToFP,
    FPToSI,
}

impl CastOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::Trunc => "trunc",
            CastOp::SIToFP => "sitofp",
            CastOp::FPToSI => "fptosi",
        }
    }
}

/// A function type, used by declarations and variadic calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnSig {
    pub ret: IrType,
    pub params: Vec<IrType>,
    pub variadic: bool,
}

impl FnSig {
    pub fn new(ret: IrType, params: Vec<IrType>) -> Self {
        Self {
            ret,
            params,
            variadic: false,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    fn params_list(&self) -> String {
        let mut parts: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        if self.variadic {
            parts.push("...".to_string());
        }
        parts.join(", ")
    }
}

/// A non-terminating instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Alloca {
        dest: String,
        ty: IrType,
    },
    Load {
        dest: String,
        ty: IrType,
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    Binary {
        dest: String,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    Compare {
        dest: String,
        pred: Predicate,
        lhs: Value,
        rhs: Value,
    },
    Cast {
        dest: String,
        op: CastOp,
        value: Value,
        to: IrType,
    },
    /// `getelementptr inbounds`; `base` is the pointee type of `ptr`.
    Gep {
        dest: String,
        base: IrType,
        ptr: Value,
        indices: Vec<Value>,
    },
    Call {
        dest: Option<String>,
        callee: String,
        sig: FnSig,
        args: Vec<Value>,
    },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Alloca { dest, ty } => write!(f, "%{dest} = alloca {ty}"),
            Instr::Load { dest, ty, ptr } => write!(f, "%{dest} = load {ty}, {}", ptr.typed()),
            Instr::Store { value, ptr } => write!(f, "store {}, {}", value.typed(), ptr.typed()),
            Instr::Binary { dest, op, lhs, rhs } => {
                write!(f, "%{dest} = {} {}, {rhs}", op.as_str(), lhs.typed())
            }
            Instr::Compare {
                dest,
                pred,
                lhs,
                rhs,
            } => {
                if lhs.ty().is_float() {
                    write!(f, "%{dest} = fcmp {} {}, {rhs}", pred.float_str(), lhs.typed())
                } else {
                    write!(f, "%{dest} = icmp {} {}, {rhs}", pred.int_str(), lhs.typed())
                }
            }
            Instr::Cast {
                dest,
                op,
                value,
                to,
            } => write!(f, "%{dest} = {} {} to {to}", op.as_str(), value.typed()),
            Instr::Gep {
                dest,
                base,
                ptr,
                indices,
            } => {
                write!(f, "%{dest} = getelementptr inbounds {base}, {}", ptr.typed())?;
                for index in indices {
                    write!(f, ", {}", index.typed())?;
                }
                Ok(())
            }
            Instr::Call {
                dest,
                callee,
                sig,
                args,
            } => {
                if let Some(dest) = dest {
                    write!(f, "%{dest} = ")?;
                }
                if sig.variadic {
                    write!(f, "call {} ({}) @{callee}(", sig.ret, sig.params_list())?;
                } else {
                    write!(f, "call {} @{callee}(", sig.ret)?;
                }
                let args: Vec<String> = args.iter().map(Value::typed).collect();
                write!(f, "{})", args.join(", "))
            }
        }
    }
}

// ============================================================================
// Blocks
// ============================================================================

/// A basic block index within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    /// The entry block is always first.
    pub const ENTRY: BlockId = BlockId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a block ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Ret(Option<Value>),
    Br(BlockId),
    CondBr {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Ret(_) => Vec::new(),
            Terminator::Br(target) => vec![*target],
            Terminator::CondBr {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Terminator::Ret(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instrs: Vec<Instr>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instrs: Vec::new(),
            terminator: None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator
            .as_ref()
            .map(Terminator::successors)
            .unwrap_or_default()
    }
}

// ============================================================================
// Functions and modules
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret: IrType,
    pub params: Vec<(String, IrType)>,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn block_named(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    /// Blocks that are the target of some branch.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        (0..self.blocks.len() as u32)
            .map(BlockId)
            .filter(|&from| self.block(from).successors().contains(&id))
            .collect()
    }

    fn write_terminator(&self, f: &mut fmt::Formatter<'_>, term: &Terminator) -> fmt::Result {
        match term {
            Terminator::Ret(Some(value)) => write!(f, "ret {}", value.typed()),
            Terminator::Ret(None) => f.write_str("ret void"),
            Terminator::Br(target) => write!(f, "br label %{}", self.block(*target).label),
            Terminator::CondBr {
                cond,
                then_block,
                else_block,
            } => write!(
                f,
                "br {}, label %{}, label %{}",
                cond.typed(),
                self.block(*then_block).label,
                self.block(*else_block).label
            ),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, ty)| format!("{ty} %{name}"))
            .collect();
        writeln!(f, "define {} @{}({}) {{", self.ret, self.name, params.join(", "))?;
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for instr in &block.instrs {
                writeln!(f, "  {instr}")?;
            }
            if let Some(term) = &block.terminator {
                f.write_str("  ")?;
                self.write_terminator(f, term)?;
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }
}

/// An external function.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub sig: FnSig,
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "declare {} @{}({})", self.sig.ret, self.name, self.sig.params_list())
    }
}

/// A private NUL-terminated byte string.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    /// Contents including the trailing NUL.
    pub bytes: Vec<u8>,
}

impl Global {
    pub fn ty(&self) -> IrType {
        IrType::Array(self.bytes.len() as u32, Box::new(IrType::I8))
    }
}

impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} = private unnamed_addr constant {} c\"", self.name, self.ty())?;
        for &byte in &self.bytes {
            if (byte.is_ascii_graphic() && byte != b'"' && byte != b'\\') || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\{byte:02X}")?;
            }
        }
        f.write_str("\"")
    }
}

/// A compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub target_triple: Option<String>,
    pub globals: Vec<Global>,
    pub declarations: Vec<Declaration>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_triple: None,
            globals: Vec::new(),
            declarations: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn instruction_count(&self) -> usize {
        self.functions
            .iter()
            .flat_map(|f| &f.blocks)
            .map(|b| b.instrs.len() + usize::from(b.is_terminated()))
            .sum()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;
        if let Some(triple) = &self.target_triple {
            writeln!(f, "target triple = \"{triple}\"")?;
        }

        if !self.globals.is_empty() {
            writeln!(f)?;
            for global in &self.globals {
                writeln!(f, "{global}")?;
            }
        }

        if !self.declarations.is_empty() {
            writeln!(f)?;
            for declaration in &self.declarations {
                writeln!(f, "{declaration}")?;
            }
        }

        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds one function block by block.
///
/// Register and label names share one namespace per function; a repeated
/// hint gets a numeric suffix.
pub struct FunctionBuilder {
    function: Function,
    current: BlockId,
    /// Allocas already hoisted to the head of the entry block.
    alloca_count: usize,
    names: FxHashMap<String, u32>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, ret: IrType, params: &[(String, IrType)]) -> Self {
        let mut builder = Self {
            function: Function {
                name: name.into(),
                ret,
                params: Vec::new(),
                blocks: Vec::new(),
            },
            current: BlockId::ENTRY,
            alloca_count: 0,
            names: FxHashMap::default(),
        };
        builder.function.params = params
            .iter()
            .map(|(name, ty)| (builder.fresh(name), ty.clone()))
            .collect();
        let entry = builder.fresh("entry");
        builder.function.blocks.push(BasicBlock::new(entry));
        builder
    }

    /// A name not yet used in this function.
    pub fn fresh(&mut self, hint: &str) -> String {
        let count = self.names.entry(hint.to_string()).or_insert(0);
        let name = if *count == 0 {
            hint.to_string()
        } else {
            format!("{hint}.{count}")
        };
        *count += 1;
        // A suffixed name may itself have been taken as a hint.
        if hint != name && self.names.contains_key(&name) {
            return self.fresh(hint);
        }
        self.names.entry(name.clone()).or_insert(1);
        name
    }

    pub fn params(&self) -> Vec<Value> {
        self.function
            .params
            .iter()
            .map(|(name, ty)| Value::Reg {
                name: name.clone(),
                ty: ty.clone(),
            })
            .collect()
    }

    pub fn return_type(&self) -> &IrType {
        &self.function.ret
    }

    pub fn new_block(&mut self, hint: &str) -> BlockId {
        let label = self.fresh(hint);
        self.function.blocks.push(BasicBlock::new(label));
        BlockId(self.function.blocks.len() as u32 - 1)
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn is_current_terminated(&self) -> bool {
        self.function.block(self.current).is_terminated()
    }

    fn push(&mut self, instr: Instr) {
        let block = &mut self.function.blocks[self.current.index()];
        if !block.is_terminated() {
            block.instrs.push(instr);
        }
    }

    /// End the current block; a block that already ended keeps its terminator.
    pub fn terminate(&mut self, term: Terminator) {
        let block = &mut self.function.blocks[self.current.index()];
        if block.terminator.is_none() {
            block.terminator = Some(term);
        }
    }

    fn reg(&mut self, hint: &str, ty: IrType) -> (String, Value) {
        let name = self.fresh(hint);
        let value = Value::Reg {
            name: name.clone(),
            ty,
        };
        (name, value)
    }

    /// Stack slot in the entry block, whatever block is current.
    pub fn alloca(&mut self, hint: &str, ty: IrType) -> Value {
        let (dest, value) = self.reg(hint, ty.pointer_to());
        self.function.blocks[BlockId::ENTRY.index()]
            .instrs
            .insert(self.alloca_count, Instr::Alloca { dest, ty });
        self.alloca_count += 1;
        value
    }

    pub fn load(&mut self, hint: &str, ptr: Value) -> Value {
        let ty = ptr.ty().pointee().cloned().unwrap_or(IrType::I32);
        let (dest, value) = self.reg(hint, ty.clone());
        self.push(Instr::Load { dest, ty, ptr });
        value
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        self.push(Instr::Store { value, ptr });
    }

    pub fn binary(&mut self, op: BinaryOp, hint: &str, lhs: Value, rhs: Value) -> Value {
        let (dest, value) = self.reg(hint, lhs.ty());
        self.push(Instr::Binary { dest, op, lhs, rhs });
        value
    }

    pub fn compare(&mut self, pred: Predicate, hint: &str, lhs: Value, rhs: Value) -> Value {
        let (dest, value) = self.reg(hint, IrType::I1);
        self.push(Instr::Compare {
            dest,
            pred,
            lhs,
            rhs,
        });
        value
    }

    pub fn cast(&mut self, op: CastOp, hint: &str, value: Value, to: IrType) -> Value {
        let (dest, result) = self.reg(hint, to.clone());
        self.push(Instr::Cast {
            dest,
            op,
            value,
            to,
        });
        result
    }

    /// Pointer to an element; `result` is the element type.
    pub fn gep(&mut self, hint: &str, ptr: Value, indices: Vec<Value>, result: IrType) -> Value {
        let base = ptr.ty().pointee().cloned().unwrap_or(IrType::I8);
        let (dest, value) = self.reg(hint, result.pointer_to());
        self.push(Instr::Gep {
            dest,
            base,
            ptr,
            indices,
        });
        value
    }

    /// Call a function; `None` for void results.
    pub fn call(&mut self, hint: &str, callee: &str, sig: &FnSig, args: Vec<Value>) -> Option<Value> {
        let (dest, value) = if sig.ret.is_void() {
            (None, None)
        } else {
            let (dest, value) = self.reg(hint, sig.ret.clone());
            (Some(dest), Some(value))
        };
        self.push(Instr::Call {
            dest,
            callee: callee.to_string(),
            sig: sig.clone(),
            args,
        });
        value
    }

    /// Labels of blocks that never got a terminator.
    pub fn unterminated(&self) -> Vec<String> {
        self.function
            .blocks
            .iter()
            .filter(|b| !b.is_terminated())
            .map(|b| b.label.clone())
            .collect()
    }

    pub fn finish(self) -> Function {
        self.function
    }
}
