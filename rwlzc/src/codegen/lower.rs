//! AST to IR lowering.
//!
//! The generator assumes an analyzed program. Anything analysis should have
//! rejected (an unknown name, a wrong argument count) stops generation with a
//! [`CodegenError`] instead of emitting partial code.
//!
//! Each function gets an entry block holding every stack slot. Statements
//! are lowered into the current block until something terminates it; the
//! rest of that statement list is unreachable and is dropped.

use rustc_hash::FxHashMap;

use crate::ast::{self, *};
use crate::codegen::error::CodegenError;
use crate::codegen::ir::{
    self, BinaryOp, CastOp, FnSig, FunctionBuilder, Global, IrType, Module, Predicate, Terminator, Value,
};
use crate::codegen::runtime::{self, RuntimeFn};
use crate::config::CodegenConfig;

/// Buffer size for numbers formatted into strings.
const NUMBER_BUFFER: i64 = 32;

/// Lowers a whole program into one module.
pub struct CodeGenerator<'a> {
    config: &'a CodegenConfig,
    module: Module,
    signatures: FxHashMap<String, FnSig>,
    /// Byte strings already emitted, by contents.
    interned: FxHashMap<Vec<u8>, String>,
    next_global: u32,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(config: &'a CodegenConfig) -> Self {
        let mut module = Module::new(config.module_name.clone());
        module.target_triple = config.target_triple.clone();
        Self {
            config,
            module,
            signatures: FxHashMap::default(),
            interned: FxHashMap::default(),
            next_global: 0,
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<Module, CodegenError> {
        self.module.declarations = runtime::declarations();

        // Every signature first, so bodies may call later functions.
        for function in &program.functions {
            self.declare(function)?;
        }

        for function in &program.functions {
            let lowered = self.lower_function(function)?;
            tracing::debug!(
                function = %lowered.name,
                blocks = lowered.blocks.len(),
                "lowered function"
            );
            self.module.functions.push(lowered);
        }

        tracing::debug!(
            module = %self.config.module_name,
            functions = self.module.functions.len(),
            globals = self.module.globals.len(),
            instructions = self.module.instruction_count(),
            "generated module"
        );
        Ok(self.module)
    }

    fn declare(&mut self, function: &ast::Function) -> Result<(), CodegenError> {
        if RuntimeFn::is_reserved(&function.name) {
            return Err(CodegenError::unsupported(format!(
                "a function named `{}`",
                function.name
            )));
        }
        if self.signatures.contains_key(&function.name) {
            return Err(CodegenError::unsupported(format!(
                "a second definition of `{}`",
                function.name
            )));
        }

        let params = function
            .params
            .iter()
            .map(|p| value_type(&p.ty, &p.name))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = match &function.return_type {
            Some(spec) if spec.name == TypeName::Void && !spec.is_array => IrType::Void,
            Some(spec) => value_type(spec, &function.name)?,
            None => IrType::Void,
        };

        self.signatures
            .insert(function.name.clone(), FnSig::new(ret, params));
        Ok(())
    }

    fn lower_function(&mut self, function: &ast::Function) -> Result<ir::Function, CodegenError> {
        let sig = self
            .signatures
            .get(&function.name)
            .cloned()
            .ok_or_else(|| CodegenError::UndeclaredFunction {
                name: function.name.clone(),
            })?;

        let params: Vec<(String, IrType)> = function
            .params
            .iter()
            .zip(&sig.params)
            .map(|(p, ty)| (p.name.clone(), ty.clone()))
            .collect();
        let builder = FunctionBuilder::new(&function.name, sig.ret.clone(), &params);

        let mut cx = FunctionLowering {
            gen: self,
            builder,
            name: function.name.clone(),
            scopes: vec![FxHashMap::default()],
            loops: Vec::new(),
        };
        cx.spill_params(function, &sig);
        cx.lower_block(&function.body)?;
        cx.finish()
    }

    /// A private global holding `bytes`, shared by identical contents.
    fn intern(&mut self, prefix: &str, bytes: Vec<u8>) -> Value {
        let ty = IrType::Array(bytes.len() as u32, Box::new(IrType::I8)).pointer_to();
        if let Some(name) = self.interned.get(&bytes) {
            return Value::Global {
                name: name.clone(),
                ty,
            };
        }

        let name = format!("{prefix}.{}", self.next_global);
        self.next_global += 1;
        self.interned.insert(bytes.clone(), name.clone());
        self.module.globals.push(Global {
            name: name.clone(),
            bytes,
        });
        Value::Global { name, ty }
    }
}

/// Storage for a named variable.
#[derive(Debug, Clone)]
enum Slot {
    /// `ptr` is a `ty*` stack slot.
    Scalar { ptr: Value, ty: IrType },
    /// A local fixed-size array; `ptr` is `[len x elem]*`.
    Array { ptr: Value, elem: IrType, len: u32 },
    /// An array passed by reference; `ptr` is an `elem**` slot.
    ArrayRef { ptr: Value, elem: IrType },
}

/// Jump targets of the innermost loop.
#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    continue_block: ir::BlockId,
    break_block: ir::BlockId,
}

/// Lowering state for one function body.
struct FunctionLowering<'g, 'a> {
    gen: &'g mut CodeGenerator<'a>,
    builder: FunctionBuilder,
    name: String,
    /// Innermost scope last.
    scopes: Vec<FxHashMap<String, Slot>>,
    loops: Vec<LoopTargets>,
}

impl FunctionLowering<'_, '_> {
    fn finish(mut self) -> Result<ir::Function, CodegenError> {
        if !self.builder.is_current_terminated() {
            let ret = self.builder.return_type().zero();
            self.builder.terminate(Terminator::Ret(ret));
        }
        if let Some(block) = self.builder.unterminated().into_iter().next() {
            return Err(CodegenError::UnterminatedBlock {
                function: self.name,
                block,
            });
        }
        Ok(self.builder.finish())
    }

    fn spill_params(&mut self, function: &ast::Function, sig: &FnSig) {
        let incoming = self.builder.params();
        for ((param, ty), value) in function.params.iter().zip(&sig.params).zip(incoming) {
            let ptr = self.builder.alloca(&format!("{}.addr", param.name), ty.clone());
            self.builder.store(value, ptr.clone());
            let slot = match ty.pointee() {
                Some(elem) if param.ty.is_array => Slot::ArrayRef {
                    ptr,
                    elem: elem.clone(),
                },
                _ => Slot::Scalar {
                    ptr,
                    ty: ty.clone(),
                },
            };
            self.define(&param.name, slot);
        }
    }

    // ============================================================
    // Scopes
    // ============================================================

    fn define(&mut self, name: &str, slot: Slot) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot);
        }
    }

    fn lookup(&self, name: &str) -> Result<Slot, CodegenError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| CodegenError::UndeclaredVariable {
                name: name.to_string(),
                function: self.name.clone(),
            })
    }

    // ============================================================
    // Statements
    // ============================================================

    fn lower_block(&mut self, block: &Block) -> Result<(), CodegenError> {
        self.scopes.push(FxHashMap::default());
        let result = self.lower_stmts(&block.statements);
        self.scopes.pop();
        result
    }

    fn lower_stmts(&mut self, stmts: &[Stmt]) -> Result<(), CodegenError> {
        for (i, stmt) in stmts.iter().enumerate() {
            if self.builder.is_current_terminated() {
                tracing::trace!(
                    function = %self.name,
                    skipped = stmts.len() - i,
                    "dropping unreachable statements"
                );
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match &stmt.kind {
            StmtKind::Block(block) => self.lower_block(block),
            StmtKind::VarDecl(decl) => self.lower_var_decl(decl),
            StmtKind::ArrayDecl(decl) => self.lower_array_decl(decl),
            StmtKind::Assign(assignment) => self.lower_assignment(assignment),
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => self.lower_if(condition, then_block, else_block.as_ref()),
            StmtKind::While { condition, body } => self.lower_while(condition, body),
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scopes.push(FxHashMap::default());
                let result = self.lower_for(init.as_deref(), condition.as_ref(), update.as_deref(), body);
                self.scopes.pop();
                result
            }
            StmtKind::Break => {
                let target = self.innermost_loop("break")?.break_block;
                self.builder.terminate(Terminator::Br(target));
                Ok(())
            }
            StmtKind::Continue => {
                let target = self.innermost_loop("continue")?.continue_block;
                self.builder.terminate(Terminator::Br(target));
                Ok(())
            }
            StmtKind::Return(value) => self.lower_return(value.as_ref()),
            StmtKind::Print(value) => self.lower_print(value),
            StmtKind::Call(call) => self.lower_call(call).map(|_| ()),
        }
    }

    fn innermost_loop(&self, keyword: &'static str) -> Result<LoopTargets, CodegenError> {
        self.loops
            .last()
            .copied()
            .ok_or(CodegenError::NoEnclosingLoop { keyword })
    }

    fn lower_var_decl(&mut self, decl: &VarDecl) -> Result<(), CodegenError> {
        let value = decl
            .value
            .as_ref()
            .map(|v| self.lower_value(v))
            .transpose()?;

        let ty = match (&value, decl.ty.name) {
            (Some(value), TypeName::Auto) if !decl.ty.is_array => value.ty(),
            _ => value_type(&decl.ty, &decl.name)?,
        };

        let ptr = self.builder.alloca(&decl.name, ty.clone());
        if let Some(value) = value {
            let value = self.convert(value, &ty)?;
            self.builder.store(value, ptr.clone());
        }

        let slot = match ty.pointee() {
            Some(elem) if decl.ty.is_array => Slot::ArrayRef {
                ptr,
                elem: elem.clone(),
            },
            _ => Slot::Scalar { ptr, ty },
        };
        self.define(&decl.name, slot);
        Ok(())
    }

    fn lower_array_decl(&mut self, decl: &ArrayDecl) -> Result<(), CodegenError> {
        let size_error = || CodegenError::UnsupportedArraySize {
            name: decl.name.clone(),
        };
        let len = match (&decl.size, &decl.values) {
            (Some(size), _) => const_int(size)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| n > 0)
                .ok_or_else(size_error)?,
            (None, Some(values)) if !values.is_empty() => {
                u32::try_from(values.len()).map_err(|_| size_error())?
            }
            _ => return Err(size_error()),
        };

        // Initializers past the declared size are never evaluated.
        let values = decl
            .values
            .iter()
            .flatten()
            .take(len as usize)
            .map(|v| self.lower_value(v))
            .collect::<Result<Vec<_>, _>>()?;

        let elem = match decl.ty.name {
            TypeName::Auto => values
                .first()
                .map(Value::ty)
                .ok_or_else(|| CodegenError::unsupported(format!("`{}` of type auto", decl.name)))?,
            TypeName::Void => return Err(CodegenError::unsupported(format!("void array `{}`", decl.name))),
            name => scalar_type(name).unwrap_or(IrType::I32),
        };

        let ptr = self
            .builder
            .alloca(&decl.name, IrType::Array(len, Box::new(elem.clone())));
        self.store_elements(&ptr, &elem, values)?;
        self.define(&decl.name, Slot::Array { ptr, elem, len });
        Ok(())
    }

    fn store_elements(&mut self, array: &Value, elem: &IrType, values: Vec<Value>) -> Result<(), CodegenError> {
        for (i, value) in values.into_iter().enumerate() {
            let value = self.convert(value, elem)?;
            let element = self.builder.gep(
                "elem",
                array.clone(),
                vec![Value::i32(0), Value::i32(i as i64)],
                elem.clone(),
            );
            self.builder.store(value, element);
        }
        Ok(())
    }

    fn lower_assignment(&mut self, assignment: &Assignment) -> Result<(), CodegenError> {
        let name = assignment.target.name();
        let slot = self.lookup(name)?;

        let (ptr, ty) = match (&assignment.target, slot) {
            (Location::Var { .. }, Slot::Scalar { ptr, ty }) => (ptr, ty),
            (Location::Var { .. }, slot) => return self.assign_whole_array(name, slot, assignment),
            (Location::Index { index, .. }, slot) => {
                let index = self.lower_value(index)?;
                self.element_ptr(name, &slot, index)?
            }
        };

        let value = match (assignment.op, &assignment.value) {
            (AssignOp::Increment | AssignOp::Decrement, _) => {
                let current = self.builder.load(name, ptr.clone());
                self.step(current, assignment.op == AssignOp::Increment)?
            }
            (AssignOp::Assign, Some(value)) => self.lower_value(value)?,
            (op, Some(value)) => {
                let current = self.builder.load(name, ptr.clone());
                let rhs = self.lower_value(value)?;
                match op.binary_op() {
                    Some(bin) => self.lower_binary_values(bin, current, rhs)?,
                    None => rhs,
                }
            }
            (op, None) => {
                return Err(CodegenError::unsupported(format!("`{op}` without a value")));
            }
        };

        let value = self.convert(value, &ty)?;
        self.builder.store(value, ptr);
        Ok(())
    }

    fn assign_whole_array(&mut self, name: &str, slot: Slot, assignment: &Assignment) -> Result<(), CodegenError> {
        let value = match (assignment.op, &assignment.value) {
            (AssignOp::Assign, Some(value)) => value,
            _ => {
                return Err(CodegenError::unsupported(format!(
                    "`{}` on the whole array `{name}`",
                    assignment.op
                )))
            }
        };

        match (slot, &value.kind) {
            (Slot::Array { ptr, elem, len }, ExprKind::ArrayLit(elements)) => {
                let values = elements
                    .iter()
                    .take(len as usize)
                    .map(|e| self.lower_value(e))
                    .collect::<Result<Vec<_>, _>>()?;
                self.store_elements(&ptr, &elem, values)
            }
            (Slot::ArrayRef { ptr, elem }, _) => {
                let value = self.lower_value(value)?;
                let value = self.convert(value, &elem.pointer_to())?;
                self.builder.store(value, ptr);
                Ok(())
            }
            (Slot::Array { ptr, elem, len }, kind) => {
                // Only a local array source has a known length.
                let count = match kind {
                    ExprKind::Variable(source) => match self.lookup(source)? {
                        Slot::Array { len: source_len, .. } => len.min(source_len),
                        _ => len,
                    },
                    _ => len,
                };
                let source = self.lower_value(value)?;
                if source.ty().pointee().is_none() {
                    return Err(CodegenError::unsupported(format!(
                        "copying a `{}` into the array `{name}`",
                        source.ty()
                    )));
                }
                self.copy_elements(&ptr, &elem, source, count)
            }
            (Slot::Scalar { .. }, _) => Err(CodegenError::NotAnArray {
                name: name.to_string(),
            }),
        }
    }

    /// Copy `count` elements from `source`, a pointer to the first element,
    /// into the local array at `dest`.
    fn copy_elements(&mut self, dest: &Value, elem: &IrType, source: Value, count: u32) -> Result<(), CodegenError> {
        let counter = self.builder.alloca("copy.i", IrType::I32);
        self.builder.store(Value::i32(0), counter.clone());

        let cond_bb = self.builder.new_block("copy.cond");
        let body_bb = self.builder.new_block("copy.body");
        let end_bb = self.builder.new_block("copy.end");
        self.builder.terminate(Terminator::Br(cond_bb));

        self.builder.switch_to(cond_bb);
        let i = self.builder.load("copy.i", counter.clone());
        let more = self
            .builder
            .compare(Predicate::Lt, "copy.more", i.clone(), Value::i32(i64::from(count)));
        self.builder.terminate(Terminator::CondBr {
            cond: more,
            then_block: body_bb,
            else_block: end_bb,
        });

        self.builder.switch_to(body_bb);
        let source_elem = source.ty().pointee().cloned().unwrap_or_else(|| elem.clone());
        let from = self.builder.gep("copy.src", source, vec![i.clone()], source_elem);
        let value = self.builder.load("copy.val", from);
        let value = self.convert(value, elem)?;
        let to = self
            .builder
            .gep("copy.dst", dest.clone(), vec![Value::i32(0), i.clone()], elem.clone());
        self.builder.store(value, to);
        let next = self.builder.binary(BinaryOp::Add, "copy.next", i, Value::i32(1));
        self.builder.store(next, counter);
        self.builder.terminate(Terminator::Br(cond_bb));

        self.builder.switch_to(end_bb);
        Ok(())
    }

    fn lower_if(&mut self, condition: &Expr, then_block: &Block, else_block: Option<&Block>) -> Result<(), CodegenError> {
        let cond = self.lower_value(condition)?;
        let cond = self.to_bool(cond)?;

        let then_bb = self.builder.new_block("if.then");
        let else_bb = self.builder.new_block("if.else");
        let merge_bb = self.builder.new_block("if.merge");
        self.builder.terminate(Terminator::CondBr {
            cond,
            then_block: then_bb,
            else_block: else_bb,
        });

        self.builder.switch_to(then_bb);
        self.lower_block(then_block)?;
        self.builder.terminate(Terminator::Br(merge_bb));

        self.builder.switch_to(else_bb);
        if let Some(else_block) = else_block {
            self.lower_block(else_block)?;
        }
        self.builder.terminate(Terminator::Br(merge_bb));

        self.builder.switch_to(merge_bb);
        Ok(())
    }

    fn lower_while(&mut self, condition: &Expr, body: &Block) -> Result<(), CodegenError> {
        let cond_bb = self.builder.new_block("while.cond");
        let body_bb = self.builder.new_block("while.body");
        let end_bb = self.builder.new_block("while.end");

        self.builder.terminate(Terminator::Br(cond_bb));

        self.builder.switch_to(cond_bb);
        let cond = self.lower_value(condition)?;
        let cond = self.to_bool(cond)?;
        self.builder.terminate(Terminator::CondBr {
            cond,
            then_block: body_bb,
            else_block: end_bb,
        });

        self.loops.push(LoopTargets {
            continue_block: cond_bb,
            break_block: end_bb,
        });
        self.builder.switch_to(body_bb);
        let result = self.lower_block(body);
        self.loops.pop();
        result?;
        self.builder.terminate(Terminator::Br(cond_bb));

        self.builder.switch_to(end_bb);
        Ok(())
    }

    fn lower_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Stmt>,
        body: &Block,
    ) -> Result<(), CodegenError> {
        if let Some(init) = init {
            self.lower_stmt(init)?;
        }

        let cond_bb = self.builder.new_block("for.cond");
        let body_bb = self.builder.new_block("for.body");
        let update_bb = self.builder.new_block("for.update");
        let end_bb = self.builder.new_block("for.end");

        self.builder.terminate(Terminator::Br(cond_bb));

        self.builder.switch_to(cond_bb);
        match condition {
            Some(condition) => {
                let cond = self.lower_value(condition)?;
                let cond = self.to_bool(cond)?;
                self.builder.terminate(Terminator::CondBr {
                    cond,
                    then_block: body_bb,
                    else_block: end_bb,
                });
            }
            // `for (;;)` runs until a break.
            None => self.builder.terminate(Terminator::Br(body_bb)),
        }

        self.loops.push(LoopTargets {
            continue_block: update_bb,
            break_block: end_bb,
        });
        self.builder.switch_to(body_bb);
        let result = self.lower_block(body);
        self.loops.pop();
        result?;
        self.builder.terminate(Terminator::Br(update_bb));

        self.builder.switch_to(update_bb);
        if let Some(update) = update {
            self.lower_stmt(update)?;
        }
        self.builder.terminate(Terminator::Br(cond_bb));

        self.builder.switch_to(end_bb);
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&Expr>) -> Result<(), CodegenError> {
        let ret = self.builder.return_type().clone();
        let value = match value {
            Some(value) => {
                let value = self.lower_value(value)?;
                if ret.is_void() {
                    None
                } else {
                    Some(self.convert(value, &ret)?)
                }
            }
            None => ret.zero(),
        };
        self.builder.terminate(Terminator::Ret(value));
        Ok(())
    }

    fn lower_print(&mut self, value: &Expr) -> Result<(), CodegenError> {
        let value = self.lower_value(value)?;
        let ty = value.ty();
        let (spec, value) = self
            .vararg(value, "%f")
            .ok_or_else(|| CodegenError::unsupported(format!("printing a value of type `{ty}`")))?;

        let format = self.format_string(&format!("{spec}\n"));
        self.call_runtime(RuntimeFn::Printf, "printed", vec![format, value]);
        Ok(())
    }

    // ============================================================
    // Expressions
    // ============================================================

    /// Lower an expression that must produce a value.
    fn lower_value(&mut self, expr: &Expr) -> Result<Value, CodegenError> {
        match &expr.kind {
            ExprKind::IntLit(value) => Ok(Value::i32(i64::from(*value))),
            ExprKind::FloatLit(value) => Ok(Value::ConstFloat(*value)),
            ExprKind::BoolLit(value) => Ok(Value::bool(*value)),
            ExprKind::CharLit(raw) => {
                let byte = decode_escapes(raw).first().copied().unwrap_or(0);
                Ok(Value::int(IrType::I8, i64::from(byte as i8)))
            }
            ExprKind::StringLit(raw) => {
                let mut bytes = decode_escapes(raw);
                bytes.push(0);
                Ok(self.string_ptr(".str", bytes))
            }
            ExprKind::Variable(name) => self.load_variable(name),
            ExprKind::Binary { op, left, right } => {
                let left = self.lower_value(left)?;
                let right = self.lower_value(right)?;
                self.lower_binary_values(*op, left, right)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.lower_value(operand)?;
                self.lower_unary(*op, operand)
            }
            ExprKind::Increment {
                name,
                increment,
                prefix,
            } => {
                let ptr = match self.lookup(name)? {
                    Slot::Scalar { ptr, .. } => ptr,
                    _ => return Err(CodegenError::unsupported(format!("incrementing the array `{name}`"))),
                };
                let old = self.builder.load(name, ptr.clone());
                let new = self.step(old.clone(), *increment)?;
                self.builder.store(new.clone(), ptr);
                Ok(if *prefix { new } else { old })
            }
            ExprKind::Index { name, index } => {
                let slot = self.lookup(name)?;
                let index = self.lower_value(index)?;
                let (ptr, _) = self.element_ptr(name, &slot, index)?;
                Ok(self.builder.load(&format!("{name}.elem"), ptr))
            }
            ExprKind::ArrayLit(elements) => self.lower_array_literal(elements, None),
            ExprKind::Call(call) => self.lower_call(call)?.ok_or_else(|| {
                CodegenError::unsupported(format!("using the void function `{}` as a value", call.name))
            }),
            ExprKind::Special { form, .. } => {
                Err(CodegenError::unsupported(format!("a {form} expression")))
            }
            ExprKind::Error => Err(CodegenError::unsupported("an erroneous expression")),
        }
    }

    fn load_variable(&mut self, name: &str) -> Result<Value, CodegenError> {
        Ok(match self.lookup(name)? {
            Slot::Scalar { ptr, .. } => self.builder.load(name, ptr),
            // Arrays decay to a pointer to their first element.
            Slot::Array { ptr, elem, .. } => {
                self.builder
                    .gep(&format!("{name}.ptr"), ptr, vec![Value::i32(0), Value::i32(0)], elem)
            }
            Slot::ArrayRef { ptr, .. } => self.builder.load(&format!("{name}.ptr"), ptr),
        })
    }

    /// Pointer to `name[index]` and the element type.
    fn element_ptr(&mut self, name: &str, slot: &Slot, index: Value) -> Result<(Value, IrType), CodegenError> {
        let index = self.convert(index, &IrType::I32)?;
        let hint = format!("{name}.elem.ptr");
        match slot {
            Slot::Array { ptr, elem, .. } => {
                let element = self
                    .builder
                    .gep(&hint, ptr.clone(), vec![Value::i32(0), index], elem.clone());
                Ok((element, elem.clone()))
            }
            Slot::ArrayRef { ptr, elem } => {
                let base = self.builder.load(&format!("{name}.ptr"), ptr.clone());
                let element = self.builder.gep(&hint, base, vec![index], elem.clone());
                Ok((element, elem.clone()))
            }
            Slot::Scalar { .. } => Err(CodegenError::NotAnArray {
                name: name.to_string(),
            }),
        }
    }

    /// A temporary array holding `elements`, decayed to a pointer.
    fn lower_array_literal(&mut self, elements: &[Expr], elem: Option<IrType>) -> Result<Value, CodegenError> {
        let values = elements
            .iter()
            .map(|e| self.lower_value(e))
            .collect::<Result<Vec<_>, _>>()?;
        let elem = elem
            .or_else(|| values.first().map(Value::ty))
            .ok_or_else(|| CodegenError::unsupported("an empty array literal"))?;

        let len = values.len() as u32;
        let array = self
            .builder
            .alloca("arraytmp", IrType::Array(len, Box::new(elem.clone())));
        self.store_elements(&array, &elem, values)?;
        Ok(self
            .builder
            .gep("arraytmp.ptr", array, vec![Value::i32(0), Value::i32(0)], elem))
    }

    fn lower_call(&mut self, call: &Call) -> Result<Option<Value>, CodegenError> {
        let sig = self
            .gen
            .signatures
            .get(&call.name)
            .cloned()
            .ok_or_else(|| CodegenError::UndeclaredFunction {
                name: call.name.clone(),
            })?;
        if sig.params.len() != call.args.len() {
            return Err(CodegenError::ArityMismatch {
                name: call.name.clone(),
                expected: sig.params.len(),
                found: call.args.len(),
            });
        }

        let mut args = Vec::with_capacity(call.args.len());
        for (arg, expected) in call.args.iter().zip(&sig.params) {
            let value = match (&arg.kind, expected.pointee()) {
                (ExprKind::ArrayLit(elements), Some(elem)) => {
                    self.lower_array_literal(elements, Some(elem.clone()))?
                }
                _ => self.lower_value(arg)?,
            };
            args.push(self.convert(value, expected)?);
        }

        Ok(self
            .builder
            .call(&format!("call.{}", call.name), &call.name, &sig, args))
    }

    fn lower_binary_values(&mut self, op: BinOp, left: Value, right: Value) -> Result<Value, CodegenError> {
        let (lt, rt) = (left.ty(), right.ty());

        if op == BinOp::Add && (lt.is_string() || rt.is_string() || (lt == IrType::I8 && rt == IrType::I8)) {
            let left = self.to_string(left)?;
            let right = self.to_string(right)?;
            return Ok(self.concat(left, right));
        }

        if let Some(pred) = predicate(op) {
            // A char compared with a string is compared as a one-character string.
            if (lt.is_string() && rt.is_string()) || (op.is_equality() && (lt.is_string() || rt.is_string())) {
                let left = self.to_string(left)?;
                let right = self.to_string(right)?;
                let order = self.call_runtime(RuntimeFn::Strcmp, "strcmp", vec![left, right]);
                return Ok(self.builder.compare(pred, "strcmp.cmp", order, Value::i32(0)));
            }
            let (left, right) = self.unify_numeric(left, right)?;
            return Ok(self.builder.compare(pred, "cmptmp", left, right));
        }

        if op.is_logical() {
            let left = self.to_bool(left)?;
            let right = self.to_bool(right)?;
            let (bin, hint) = if op == BinOp::And {
                (BinaryOp::And, "andtmp")
            } else {
                (BinaryOp::Or, "ortmp")
            };
            return Ok(self.builder.binary(bin, hint, left, right));
        }

        let (left, right) = self.unify_numeric(left, right)?;
        let float = left.ty().is_float();
        let (bin, hint) = match op {
            BinOp::Add if float => (BinaryOp::FAdd, "faddtmp"),
            BinOp::Add => (BinaryOp::Add, "addtmp"),
            BinOp::Sub if float => (BinaryOp::FSub, "fsubtmp"),
            BinOp::Sub => (BinaryOp::Sub, "subtmp"),
            BinOp::Mul if float => (BinaryOp::FMul, "fmultmp"),
            BinOp::Mul => (BinaryOp::Mul, "multmp"),
            BinOp::Div if float => (BinaryOp::FDiv, "fdivtmp"),
            BinOp::Div => (BinaryOp::SDiv, "divtmp"),
            BinOp::Rem if float => (BinaryOp::FRem, "fmodtmp"),
            BinOp::Rem => (BinaryOp::SRem, "modtmp"),
            _ => return Err(CodegenError::unsupported(format!("operator `{op}`"))),
        };
        Ok(self.builder.binary(bin, hint, left, right))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: Value) -> Result<Value, CodegenError> {
        let ty = operand.ty();
        match op {
            UnaryOp::Plus => Ok(operand),
            UnaryOp::Neg if ty.is_float() => {
                Ok(self
                    .builder
                    .binary(BinaryOp::FMul, "fnegtmp", operand, Value::ConstFloat(-1.0)))
            }
            UnaryOp::Neg if ty.is_int() => {
                Ok(self
                    .builder
                    .binary(BinaryOp::Sub, "negtmp", Value::int(ty, 0), operand))
            }
            UnaryOp::Neg => Err(CodegenError::unsupported(format!("negating a `{ty}`"))),
            UnaryOp::Not => {
                let truth = self.to_bool(operand)?;
                Ok(self
                    .builder
                    .binary(BinaryOp::Xor, "nottmp", truth, Value::bool(true)))
            }
        }
    }

    /// `value + 1` or `value - 1` in the value's own type.
    fn step(&mut self, value: Value, increment: bool) -> Result<Value, CodegenError> {
        let ty = value.ty();
        let (op, one, hint) = match (ty.is_float(), increment) {
            (true, true) => (BinaryOp::FAdd, Value::ConstFloat(1.0), "inctmp"),
            (true, false) => (BinaryOp::FSub, Value::ConstFloat(1.0), "dectmp"),
            (false, _) if !ty.is_int() => {
                return Err(CodegenError::unsupported(format!("incrementing a `{ty}`")))
            }
            (false, true) => (BinaryOp::Add, Value::int(ty, 1), "inctmp"),
            (false, false) => (BinaryOp::Sub, Value::int(ty, 1), "dectmp"),
        };
        Ok(self.builder.binary(op, hint, value, one))
    }

    // ============================================================
    // Conversions
    // ============================================================

    /// Bring two numeric operands to a common type.
    fn unify_numeric(&mut self, left: Value, right: Value) -> Result<(Value, Value), CodegenError> {
        let (lt, rt) = (left.ty(), right.ty());
        let numeric = |t: &IrType| t.is_int() || t.is_float();
        if !numeric(&lt) || !numeric(&rt) {
            return Err(CodegenError::unsupported(format!(
                "an operation on `{lt}` and `{rt}`"
            )));
        }

        let common = if lt == rt {
            return Ok((left, right));
        } else if lt.is_float() || rt.is_float() {
            IrType::Double
        } else {
            IrType::I32
        };
        Ok((self.convert(left, &common)?, self.convert(right, &common)?))
    }

    /// Truthiness as an `i1`.
    fn to_bool(&mut self, value: Value) -> Result<Value, CodegenError> {
        let ty = value.ty();
        if ty.is_bool() {
            return Ok(value);
        }
        match ty.zero() {
            Some(zero) if ty.is_int() || ty.is_float() || ty.is_ptr() => {
                Ok(self.builder.compare(Predicate::Ne, "tobool", value, zero))
            }
            _ => Err(CodegenError::unsupported(format!("using a `{ty}` as a condition"))),
        }
    }

    /// Convert for storage into a slot, parameter or return value of type
    /// `target`.
    fn convert(&mut self, value: Value, target: &IrType) -> Result<Value, CodegenError> {
        let from = value.ty();
        if from == *target {
            return Ok(value);
        }

        let converted = match (from.int_width(), target.int_width()) {
            (Some(1), Some(_)) => self.builder.cast(CastOp::ZExt, "bool_to_int", value, target.clone()),
            (Some(_), Some(1)) => {
                let zero = Value::int(from, 0);
                self.builder.compare(Predicate::Ne, "int_to_bool", value, zero)
            }
            (Some(a), Some(b)) if a < b => self.builder.cast(CastOp::SExt, "sext", value, target.clone()),
            (Some(_), Some(_)) => self.builder.cast(CastOp::Trunc, "trunc", value, target.clone()),
            (Some(width), None) if target.is_float() => {
                let value = if width == 1 {
                    self.builder.cast(CastOp::ZExt, "bool_to_int", value, IrType::I32)
                } else {
                    value
                };
                self.builder.cast(CastOp::SIToFP, "int_to_float", value, IrType::Double)
            }
            (Some(8), None) if target.is_string() => self.to_string(value)?,
            (None, Some(1)) if from.is_float() => {
                self.builder
                    .compare(Predicate::Ne, "float_to_bool", value, Value::ConstFloat(0.0))
            }
            (None, Some(_)) if from.is_float() => {
                self.builder.cast(CastOp::FPToSI, "float_to_int", value, target.clone())
            }
            _ => {
                return Err(CodegenError::unsupported(format!(
                    "converting a `{from}` to `{target}`"
                )))
            }
        };
        Ok(converted)
    }

    /// The printf conversion for a value, with the value promoted the way
    /// C varargs expect.
    fn vararg(&mut self, value: Value, float_spec: &'static str) -> Option<(&'static str, Value)> {
        let ty = value.ty();
        match ty {
            IrType::I32 => Some(("%d", value)),
            IrType::I64 => Some(("%ld", value)),
            IrType::I1 => Some(("%d", self.builder.cast(CastOp::ZExt, "bool_to_int", value, IrType::I32))),
            IrType::I8 => Some(("%c", self.builder.cast(CastOp::SExt, "char_to_int", value, IrType::I32))),
            IrType::Double => Some((float_spec, value)),
            _ if ty.is_string() => Some(("%s", value)),
            IrType::Ptr(_) => Some(("%p", value)),
            _ => None,
        }
    }

    /// Format a scalar into a fresh heap string.
    fn to_string(&mut self, value: Value) -> Result<Value, CodegenError> {
        let ty = value.ty();
        if ty.is_string() {
            return Ok(value);
        }
        let (spec, value) = self
            .vararg(value, "%.2f")
            .ok_or_else(|| CodegenError::unsupported(format!("converting a `{ty}` to a string")))?;

        let buffer = self.call_runtime(
            RuntimeFn::Malloc,
            "str_buffer",
            vec![Value::int(IrType::I64, NUMBER_BUFFER)],
        );
        let format = self.format_string(spec);
        self.call_runtime(RuntimeFn::Sprintf, "formatted", vec![buffer.clone(), format, value]);
        Ok(buffer)
    }

    /// `left + right` in a fresh heap buffer.
    fn concat(&mut self, left: Value, right: Value) -> Value {
        let len_left = self.call_runtime(RuntimeFn::Strlen, "len_left", vec![left.clone()]);
        let len_right = self.call_runtime(RuntimeFn::Strlen, "len_right", vec![right.clone()]);
        let total = self
            .builder
            .binary(BinaryOp::Add, "total_len", len_left, len_right);
        let size = self.builder.binary(
            BinaryOp::Add,
            "total_with_null",
            total,
            Value::int(IrType::I64, 1),
        );
        let buffer = self.call_runtime(RuntimeFn::Malloc, "concat_str", vec![size]);
        self.call_runtime(RuntimeFn::Strcpy, "strcpy", vec![buffer.clone(), left]);
        self.call_runtime(RuntimeFn::Strcat, "strcat_result", vec![buffer, right])
    }

    fn call_runtime(&mut self, function: RuntimeFn, hint: &str, args: Vec<Value>) -> Value {
        let sig = function.sig();
        // Every runtime function returns a value.
        self.builder
            .call(hint, function.name(), &sig, args)
            .unwrap_or(Value::Null(sig.ret))
    }

    /// `i8*` to the first byte of an interned global.
    fn string_ptr(&mut self, prefix: &str, bytes: Vec<u8>) -> Value {
        let global = self.gen.intern(prefix, bytes);
        self.builder.gep(
            "str.ptr",
            global,
            vec![Value::i32(0), Value::i32(0)],
            IrType::I8,
        )
    }

    fn format_string(&mut self, format: &str) -> Value {
        let mut bytes = format.as_bytes().to_vec();
        bytes.push(0);
        self.string_ptr(".fmt", bytes)
    }
}

// ============================================================
// Helpers
// ============================================================

/// The IR type of a declared scalar; `auto` has none until inferred.
fn scalar_type(name: TypeName) -> Option<IrType> {
    Some(match name {
        TypeName::Auto => return None,
        TypeName::Int => IrType::I32,
        TypeName::Float => IrType::Double,
        TypeName::Bool => IrType::I1,
        TypeName::Char => IrType::I8,
        TypeName::String => IrType::i8_ptr(),
        TypeName::Void => IrType::Void,
    })
}

/// How a variable, parameter or return value declared as `spec` is held.
/// Arrays are passed around as a pointer to their first element.
fn value_type(spec: &TypeSpec, name: &str) -> Result<IrType, CodegenError> {
    let ty = scalar_type(spec.name)
        .ok_or_else(|| CodegenError::unsupported(format!("`{name}` of type auto")))?;
    if ty.is_void() {
        return Err(CodegenError::unsupported(format!("`{name}` of type void")));
    }
    Ok(if spec.is_array { ty.pointer_to() } else { ty })
}

fn predicate(op: BinOp) -> Option<Predicate> {
    match op {
        BinOp::Eq => Some(Predicate::Eq),
        BinOp::Ne => Some(Predicate::Ne),
        BinOp::Lt => Some(Predicate::Lt),
        BinOp::Le => Some(Predicate::Le),
        BinOp::Gt => Some(Predicate::Gt),
        BinOp::Ge => Some(Predicate::Ge),
        _ => None,
    }
}

/// Fold an integer constant expression.
fn const_int(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::IntLit(value) => Some(i64::from(*value)),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => const_int(operand)?.checked_neg(),
        ExprKind::Unary {
            op: UnaryOp::Plus,
            operand,
        } => const_int(operand),
        ExprKind::Binary { op, left, right } => {
            let (l, r) = (const_int(left)?, const_int(right)?);
            match op {
                BinOp::Add => l.checked_add(r),
                BinOp::Sub => l.checked_sub(r),
                BinOp::Mul => l.checked_mul(r),
                BinOp::Div => l.checked_div(r),
                BinOp::Rem => l.checked_rem(r),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Decode the escapes of a raw literal. Unknown escapes are kept as written.
pub fn decode_escapes(raw: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.bytes();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'r') => out.push(b'\r'),
            Some(b'0') => out.push(0),
            Some(b'a') => out.push(0x07),
            Some(b'b') => out.push(0x08),
            Some(b'f') => out.push(0x0C),
            Some(b'v') => out.push(0x0B),
            Some(b'e') => out.push(0x1B),
            Some(escaped @ (b'\\' | b'"' | b'\'')) => out.push(escaped),
            Some(other) => out.extend([b'\\', other]),
            None => out.push(b'\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ir::BlockId;
    use crate::parser::Parser;

    fn lower(source: &str) -> Result<Module, CodegenError> {
        let program = Parser::new(source)
            .parse_program()
            .expect("test source should parse");
        CodeGenerator::new(&CodegenConfig::default()).generate(&program)
    }

    fn lower_ok(source: &str) -> Module {
        match lower(source) {
            Ok(module) => module,
            Err(e) => panic!("generation failed: {e}\nsource:\n{source}"),
        }
    }

    fn labels(function: &ir::Function) -> Vec<&str> {
        function.blocks.iter().map(|b| b.label.as_str()).collect()
    }

    #[test]
    fn test_minimal_main() {
        let module = lower_ok("int main() { return 0; }");
        assert_eq!(module.functions.len(), 1);

        let main = &module.functions[0];
        assert_eq!(main.ret, IrType::I32);
        assert_eq!(main.blocks.len(), 1);
        assert_eq!(
            main.blocks[0].terminator,
            Some(Terminator::Ret(Some(Value::i32(0))))
        );
    }

    #[test]
    fn test_runtime_is_always_declared() {
        let module = lower_ok("void main() { }");
        let names: Vec<&str> = module.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            ["printf", "sprintf", "strlen", "strcpy", "strcat", "strcmp", "malloc"]
        );
    }

    #[test]
    fn test_missing_return_gets_zero() {
        let module = lower_ok("int f() { int x = 1; }");
        let f = module.function("f").unwrap();
        assert_eq!(
            f.blocks.last().unwrap().terminator,
            Some(Terminator::Ret(Some(Value::i32(0))))
        );
    }

    #[test]
    fn test_if_else_blocks() {
        let module = lower_ok(
            "int pick(bool c) { if (c) { return 1; } else { return 2; } }",
        );
        let pick = module.function("pick").unwrap();
        assert_eq!(labels(pick), ["entry", "if.then", "if.else", "if.merge"]);

        let then_block = pick.block_named("if.then").unwrap();
        let else_block = pick.block_named("if.else").unwrap();
        assert!(then_block.terminator.as_ref().unwrap().is_return());
        assert!(else_block.terminator.as_ref().unwrap().is_return());
        assert!(pick.block_named("if.merge").unwrap().is_terminated());
    }

    #[test]
    fn test_while_continue_targets_condition() {
        let module = lower_ok(
            "void f() { int i = 0; while (i < 3) { i++; continue; } }",
        );
        let f = module.function("f").unwrap();
        assert_eq!(labels(f), ["entry", "while.cond", "while.body", "while.end"]);

        let cond = BlockId(1);
        let body = f.block_named("while.body").unwrap();
        assert_eq!(body.terminator, Some(Terminator::Br(cond)));
    }

    #[test]
    fn test_for_continue_targets_update() {
        let module = lower_ok(
            "void f() { for (int i = 0; i < 3; i++) { continue; } }",
        );
        let f = module.function("f").unwrap();
        assert_eq!(
            labels(f),
            ["entry", "for.cond", "for.body", "for.update", "for.end"]
        );
        let body = f.block_named("for.body").unwrap();
        assert_eq!(body.terminator, Some(Terminator::Br(BlockId(3))));
    }

    #[test]
    fn test_allocas_stay_in_entry() {
        let module = lower_ok(
            "void f() { while (true) { int x = 1; break; } }",
        );
        let f = module.function("f").unwrap();
        let allocas = |block: &ir::BasicBlock| {
            block
                .instrs
                .iter()
                .filter(|i| matches!(i, ir::Instr::Alloca { .. }))
                .count()
        };
        assert_eq!(allocas(&f.blocks[0]), 1);
        assert!(f.blocks[1..].iter().all(|b| allocas(b) == 0));
    }

    #[test]
    fn test_unreachable_statements_are_dropped() {
        let module = lower_ok("int f() { return 1; print(2); }");
        let f = module.function("f").unwrap();
        assert_eq!(f.blocks.len(), 1);
        assert!(f.blocks[0].instrs.is_empty());
        assert!(module.globals.is_empty());
    }

    #[test]
    fn test_print_formats_are_shared() {
        let module = lower_ok("void f() { print(1); print(2); print(\"hi\"); }");
        let names: Vec<&str> = module.globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, [".fmt.0", ".str.1", ".fmt.2"]);
        assert_eq!(module.global(".fmt.0").unwrap().bytes, b"%d\n\0");
        assert_eq!(module.global(".fmt.2").unwrap().bytes, b"%s\n\0");
    }

    #[test]
    fn test_string_literal_escapes() {
        let module = lower_ok(r#"void f() { string s = "a\tb\n"; }"#);
        assert_eq!(module.global(".str.0").unwrap().bytes, b"a\tb\n\0");
    }

    #[test]
    fn test_string_concatenation_calls_runtime() {
        let module = lower_ok(
            r#"string greet(string name) { return "hi " + name; }"#,
        );
        let text = module.function("greet").unwrap().to_string();
        for needle in ["@strlen", "@malloc", "@strcpy", "@strcat"] {
            assert!(text.contains(needle), "missing {needle} in\n{text}");
        }
    }

    #[test]
    fn test_number_to_string_uses_sprintf() {
        let module = lower_ok(r#"string f(float x) { return "x=" + x; }"#);
        let text = module.function("f").unwrap().to_string();
        assert!(text.contains("@sprintf"));
        assert!(module.globals.iter().any(|g| g.bytes == b"%.2f\0"));
    }

    #[test]
    fn test_string_comparison_uses_strcmp() {
        let module = lower_ok("bool same(string a, string b) { return a == b; }");
        let text = module.function("same").unwrap().to_string();
        assert!(text.contains("call i32 @strcmp(i8* %a.1, i8* %b.1)"), "{text}");
        assert!(text.contains("icmp eq i32 %strcmp, 0"), "{text}");
    }

    #[test]
    fn test_char_string_equality_compares_strings() {
        let module = lower_ok(
            "bool same(string s, char c) { return s == c; }\n\
             bool differ(string s, char c) { return c != s; }",
        );
        assert!(module.globals.iter().any(|g| g.bytes == b"%c\0"));

        let same = module.function("same").unwrap().to_string();
        assert!(same.contains("@sprintf"), "{same}");
        assert!(same.contains("call i32 @strcmp(i8* %s.1, i8* %str_buffer)"), "{same}");
        assert!(same.contains("icmp eq i32 %strcmp, 0"), "{same}");

        let differ = module.function("differ").unwrap().to_string();
        assert!(differ.contains("call i32 @strcmp(i8* %str_buffer, i8* %s.1)"), "{differ}");
        assert!(differ.contains("icmp ne i32 %strcmp, 0"), "{differ}");
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_double() {
        let module = lower_ok("float f(int a, float b) { return a * b; }");
        let text = module.function("f").unwrap().to_string();
        assert!(text.contains("sitofp i32 %a.1 to double"), "{text}");
        assert!(text.contains("fmul double"), "{text}");
    }

    #[test]
    fn test_float_constants_render_in_hex() {
        let module = lower_ok("float f() { return 0.5; }");
        let text = module.function("f").unwrap().to_string();
        assert!(text.contains("ret double 0x3FE0000000000000"), "{text}");
    }

    #[test]
    fn test_array_declaration_and_index() {
        let module = lower_ok(
            "int f() { int xs[3] = [1, 2, 3]; xs[1] = 5; return xs[1]; }",
        );
        let text = module.function("f").unwrap().to_string();
        assert!(text.contains("%xs = alloca [3 x i32]"), "{text}");
        assert!(
            text.contains("getelementptr inbounds [3 x i32], [3 x i32]* %xs, i32 0, i32 2"),
            "{text}"
        );
    }

    #[test]
    fn test_array_size_is_folded() {
        let module = lower_ok("void f() { int xs[2 * 4 - 1]; }");
        let text = module.function("f").unwrap().to_string();
        assert!(text.contains("alloca [7 x i32]"), "{text}");
    }

    #[test]
    fn test_whole_array_assignment_copies_shorter_length() {
        let module = lower_ok(
            "int f() { int a[2] = [1, 2]; int b[3] = [3, 4, 5]; a = b; return a[0]; }",
        );
        let f = module.function("f").unwrap();
        assert_eq!(
            labels(f),
            ["entry", "copy.cond", "copy.body", "copy.end"]
        );
        let body = f.block_named("copy.body").unwrap();
        assert_eq!(body.terminator, Some(Terminator::Br(BlockId(1))));

        let text = f.to_string();
        assert!(text.contains("icmp slt i32 %copy.i.1, 2"), "{text}");
    }

    #[test]
    fn test_whole_array_assignment_from_parameter() {
        let module = lower_ok("void f(array int src) { int a[4]; a = src; }");
        let text = module.function("f").unwrap().to_string();
        assert!(text.contains("icmp slt i32 %copy.i.1, 4"), "{text}");
    }

    #[test]
    fn test_auto_signature_is_rejected() {
        let err = lower(r#"auto f() { return "x"; }"#).unwrap_err();
        assert_eq!(err, CodegenError::unsupported("`f` of type auto"));

        let err = lower("void f() { auto x; }").unwrap_err();
        assert_eq!(err, CodegenError::unsupported("`x` of type auto"));
    }

    #[test]
    fn test_unconvertible_value_is_rejected() {
        let err = lower(r#"int main() { int x = "s"; return x; }"#).unwrap_err();
        assert_eq!(err, CodegenError::unsupported("converting a `i8*` to `i32`"));
    }

    #[test]
    fn test_non_constant_array_size() {
        let err = lower("void f(int n) { int xs[n]; }").unwrap_err();
        assert_eq!(err, CodegenError::UnsupportedArraySize { name: "xs".into() });
    }

    #[test]
    fn test_array_argument_decays() {
        let module = lower_ok(
            "int first(array int xs) { return xs[0]; }\n\
             int main() { int v[2] = [4, 5]; return first(v); }",
        );
        let first = module.function("first").unwrap();
        assert_eq!(first.params[0].1, IrType::I32.pointer_to());
        let main = module.function("main").unwrap().to_string();
        assert!(main.contains("call i32 @first(i32* %v.ptr)"), "{main}");
    }

    #[test]
    fn test_undeclared_function() {
        let err = lower("int main() { return missing(1); }").unwrap_err();
        assert_eq!(err, CodegenError::UndeclaredFunction { name: "missing".into() });
    }

    #[test]
    fn test_arity_mismatch() {
        let err = lower("int one(int a) { return a; } int main() { return one(); }").unwrap_err();
        assert_eq!(
            err,
            CodegenError::ArityMismatch {
                name: "one".into(),
                expected: 1,
                found: 0,
            }
        );
    }

    #[test]
    fn test_break_outside_loop() {
        let err = lower("void f() { break; }").unwrap_err();
        assert_eq!(err, CodegenError::NoEnclosingLoop { keyword: "break" });
    }

    #[test]
    fn test_runtime_name_is_rejected() {
        let err = lower("int strlen(string s) { return 0; }").unwrap_err();
        assert!(matches!(err, CodegenError::Unsupported { .. }));
    }

    #[test]
    fn test_void_call_as_value() {
        let err = lower("void nothing() { } int main() { int x = nothing(); return x; }").unwrap_err();
        assert!(matches!(err, CodegenError::Unsupported { .. }));
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_escapes(r"a\nb"), b"a\nb");
        assert_eq!(decode_escapes(r#"\"q\""#), b"\"q\"");
        assert_eq!(decode_escapes(r"\0\e"), [0, 0x1B]);
        assert_eq!(decode_escapes(r"\q"), b"\\q");
        assert_eq!(decode_escapes("tail\\"), b"tail\\");
    }

    #[test]
    fn test_module_header() {
        let config = CodegenConfig {
            module_name: "demo".into(),
            target_triple: Some("x86_64-pc-linux-gnu".into()),
        };
        let program = Parser::new("void main() { }").parse_program().unwrap();
        let module = CodeGenerator::new(&config).generate(&program).unwrap();
        let text = module.to_string();
        assert!(text.starts_with(
            "; ModuleID = 'demo'\nsource_filename = \"demo\"\ntarget triple = \"x86_64-pc-linux-gnu\"\n"
        ));
    }
}
