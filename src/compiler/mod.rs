//! AST to bytecode lowering
//!
//! The compiler walks the syntax tree and emits stack-based bytecode
//! into a [`ChunkBuilder`]. Jumps are emitted with placeholders and
//! back-patched with absolute targets. Nested functions compile on a
//! builder stack; the whole stack doubles as a root provider so
//! half-built pools survive collections triggered by pool allocations.

pub mod builder;
pub mod bytecode;

use std::rc::Rc;

use crate::ast::{
    BinaryOp, Declarator, Expr, FunctionDef, LogicalOp, Program, Span, Stmt, StmtKind, UnaryOp,
};
use crate::compiler::builder::{ChunkBuilder, JumpPlaceholder};
use crate::compiler::bytecode::{Chunk, Op};
use crate::error::JsError;
use crate::gc::Heap;

struct LoopState {
    start: usize,
    breaks: Vec<JumpPlaceholder>,
}

pub struct Compiler {
    builders: Vec<ChunkBuilder>,
    loops: Vec<Vec<LoopState>>,
    span: Span,
}

impl Compiler {
    /// Compiles a whole program to its top-level chunk.
    ///
    /// The final top-level expression statement keeps its value on the
    /// stack so script evaluation has a completion value; every other
    /// expression statement pops.
    pub fn compile_program(heap: &mut Heap, program: &Program) -> Result<Rc<Chunk>, JsError> {
        let mut compiler = Compiler {
            builders: vec![ChunkBuilder::new(Some("<main>".to_string()))],
            loops: vec![Vec::new()],
            span: Span::default(),
        };

        let last_expr = program
            .body
            .len()
            .checked_sub(1)
            .filter(|&i| matches!(program.body[i].kind, StmtKind::Expression(_)));
        for (i, stmt) in program.body.iter().enumerate() {
            compiler.compile_stmt(heap, stmt, last_expr == Some(i))?;
        }
        compiler.builder().emit_op(Op::Halt);

        match compiler.builders.pop() {
            Some(builder) => Ok(Rc::new(builder.finish())),
            None => unreachable!("builder stack underflow"),
        }
    }

    fn builder(&mut self) -> &mut ChunkBuilder {
        match self.builders.last_mut() {
            Some(builder) => builder,
            None => unreachable!("builder stack underflow"),
        }
    }

    fn loop_stack(&mut self) -> &mut Vec<LoopState> {
        match self.loops.last_mut() {
            Some(stack) => stack,
            None => unreachable!("loop stack underflow"),
        }
    }

    fn error(&self, message: impl Into<String>) -> JsError {
        JsError::syntax_error(message, self.span.line, self.span.column)
    }

    /// Interns `text` and adds it to the current chunk's string pool.
    fn add_string(&mut self, heap: &mut Heap, text: &str) -> Result<u32, JsError> {
        let r = heap.intern(text, &self.builders)?;
        self.builder().add_string(text, r)
    }

    /// Adds a string literal to the current chunk's constant pool.
    fn add_string_constant(&mut self, heap: &mut Heap, text: &str) -> Result<u32, JsError> {
        if let Some(builder) = self.builders.last() {
            if let Some(index) = builder.lookup_string_constant(text) {
                return Ok(index);
            }
        }
        let r = heap.alloc_string(text, &self.builders)?;
        self.builder().add_string_constant(text, r)
    }

    // ── Statements ─────────────────────────────────────────────────

    fn compile_stmt(&mut self, heap: &mut Heap, stmt: &Stmt, keep_value: bool) -> Result<(), JsError> {
        self.span = stmt.span;
        self.builder().set_span(stmt.span);

        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expr(heap, expr)?;
                if !keep_value {
                    self.builder().emit_op(Op::Pop);
                }
            }
            StmtKind::VarDecl { declarations, .. } => {
                for Declarator { name, init } in declarations {
                    match init {
                        Some(expr) => self.compile_expr(heap, expr)?,
                        None => {
                            self.builder().emit_op(Op::PushUndefined);
                        }
                    }
                    let name_index = self.add_string(heap, name)?;
                    self.builder().emit(Op::StoreVar, name_index);
                }
            }
            StmtKind::FunctionDecl(def) => {
                let function_index = self.compile_function(heap, def)?;
                self.builder().emit(Op::Closure, function_index);
                let name = def.name.as_deref().unwrap_or_default().to_string();
                let name_index = self.add_string(heap, &name)?;
                self.builder().emit(Op::StoreVar, name_index);
            }
            StmtKind::Block(body) => {
                for stmt in body {
                    self.compile_stmt(heap, stmt, false)?;
                }
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.compile_expr(heap, test)?;
                let to_else = self.builder().emit_jump(Op::JumpIfFalse);
                self.compile_stmt(heap, consequent, false)?;
                match alternate {
                    Some(alternate) => {
                        let to_end = self.builder().emit_jump(Op::Jump);
                        self.builder().patch_jump(to_else);
                        self.compile_stmt(heap, alternate, false)?;
                        self.builder().patch_jump(to_end);
                    }
                    None => {
                        self.builder().patch_jump(to_else);
                    }
                }
            }
            StmtKind::While { test, body } => {
                let start = self.builder().current_offset();
                self.loop_stack().push(LoopState {
                    start,
                    breaks: Vec::new(),
                });
                self.compile_expr(heap, test)?;
                let exit = self.builder().emit_jump(Op::JumpIfFalse);
                self.compile_stmt(heap, body, false)?;
                self.builder().emit(Op::Jump, start as u32);
                self.builder().patch_jump(exit);
                let state = match self.loop_stack().pop() {
                    Some(state) => state,
                    None => unreachable!("loop stack underflow"),
                };
                for placeholder in state.breaks {
                    self.builder().patch_jump(placeholder);
                }
            }
            StmtKind::Return(argument) => {
                match argument {
                    Some(expr) => self.compile_expr(heap, expr)?,
                    None => {
                        self.builder().emit_op(Op::PushUndefined);
                    }
                }
                self.builder().emit_op(Op::Return);
            }
            StmtKind::Break => {
                if self.loop_stack().is_empty() {
                    return Err(self.error("'break' outside of a loop"));
                }
                let placeholder = self.builder().emit_jump(Op::Jump);
                if let Some(state) = self.loop_stack().last_mut() {
                    state.breaks.push(placeholder);
                }
            }
            StmtKind::Continue => {
                let start = match self.loop_stack().last() {
                    Some(state) => state.start,
                    None => return Err(self.error("'continue' outside of a loop")),
                };
                self.builder().emit(Op::Jump, start as u32);
            }
        }
        Ok(())
    }

    // ── Expressions ────────────────────────────────────────────────

    fn compile_expr(&mut self, heap: &mut Heap, expr: &Expr) -> Result<(), JsError> {
        match expr {
            Expr::Number(n) => {
                let index = self.builder().add_number(*n)?;
                self.builder().emit(Op::LoadConst, index);
            }
            Expr::String(s) => {
                let index = self.add_string_constant(heap, s)?;
                self.builder().emit(Op::LoadConst, index);
            }
            Expr::Boolean(true) => {
                self.builder().emit_op(Op::PushTrue);
            }
            Expr::Boolean(false) => {
                self.builder().emit_op(Op::PushFalse);
            }
            Expr::Null => {
                self.builder().emit_op(Op::PushNull);
            }
            Expr::Undefined => {
                self.builder().emit_op(Op::PushUndefined);
            }
            Expr::Identifier(name) => {
                let index = self.add_string(heap, name)?;
                self.builder().emit(Op::LoadVar, index);
            }
            Expr::Unary { op, argument } => {
                self.compile_expr(heap, argument)?;
                match op {
                    UnaryOp::Neg => self.builder().emit_op(Op::Neg),
                    UnaryOp::Plus => self.builder().emit_op(Op::Plus),
                    UnaryOp::Not => self.builder().emit_op(Op::Not),
                    UnaryOp::BitNot => self.builder().emit_op(Op::BitNot),
                    UnaryOp::Typeof => self.builder().emit_op(Op::Typeof),
                    UnaryOp::Void => {
                        self.builder().emit_op(Op::Pop);
                        self.builder().emit_op(Op::PushUndefined)
                    }
                };
            }
            Expr::Binary { op, left, right } => {
                self.compile_expr(heap, left)?;
                self.compile_expr(heap, right)?;
                let op = match op {
                    BinaryOp::Add => Op::Add,
                    BinaryOp::Sub => Op::Sub,
                    BinaryOp::Mul => Op::Mul,
                    BinaryOp::Div => Op::Div,
                    BinaryOp::Mod => Op::Mod,
                    BinaryOp::BitAnd => Op::BitAnd,
                    BinaryOp::BitOr => Op::BitOr,
                    BinaryOp::BitXor => Op::BitXor,
                    BinaryOp::Shl => Op::Shl,
                    BinaryOp::Shr => Op::Shr,
                    BinaryOp::Eq => Op::Eq,
                    BinaryOp::Ne => Op::Ne,
                    BinaryOp::Lt => Op::Lt,
                    BinaryOp::Le => Op::Le,
                    BinaryOp::Gt => Op::Gt,
                    BinaryOp::Ge => Op::Ge,
                };
                self.builder().emit_op(op);
            }
            Expr::Logical { op, left, right } => {
                self.compile_expr(heap, left)?;
                self.compile_expr(heap, right)?;
                let op = match op {
                    LogicalOp::And => Op::And,
                    LogicalOp::Or => Op::Or,
                };
                self.builder().emit_op(op);
            }
            Expr::Assignment { target, value } => {
                self.compile_assignment(heap, target, value)?;
            }
            Expr::Call { callee, arguments } => {
                self.compile_expr(heap, callee)?;
                for argument in arguments {
                    self.compile_expr(heap, argument)?;
                }
                self.builder().emit(Op::Call, arguments.len() as u32);
            }
            Expr::Member {
                object,
                property,
                computed,
            } => {
                self.compile_expr(heap, object)?;
                if *computed {
                    self.compile_expr(heap, property)?;
                    self.builder().emit_op(Op::GetPropComputed);
                } else {
                    let name = property_name(property)
                        .ok_or_else(|| self.error("invalid property access"))?;
                    let index = self.add_string(heap, &name)?;
                    self.builder().emit(Op::GetProp, index);
                }
            }
            Expr::ArrayLiteral(elements) => {
                self.builder()
                    .emit(Op::NewArray, elements.len() as u32);
                for element in elements {
                    self.compile_expr(heap, element)?;
                    self.builder().emit_op(Op::ArrayPush);
                }
            }
            Expr::ObjectLiteral(properties) => {
                self.builder().emit_op(Op::NewObject);
                for (key, value) in properties {
                    self.builder().emit_op(Op::Dup);
                    self.compile_expr(heap, value)?;
                    self.builder().emit_op(Op::Swap);
                    let index = self.add_string(heap, key)?;
                    self.builder().emit(Op::SetProp, index);
                }
            }
            Expr::Function(def) => {
                let function_index = self.compile_function(heap, def)?;
                self.builder().emit(Op::Closure, function_index);
            }
        }
        Ok(())
    }

    /// Assignments leave the assigned value on the stack (they are
    /// expressions).
    fn compile_assignment(
        &mut self,
        heap: &mut Heap,
        target: &Expr,
        value: &Expr,
    ) -> Result<(), JsError> {
        self.compile_expr(heap, value)?;
        match target {
            Expr::Identifier(name) => {
                self.builder().emit_op(Op::Dup);
                let index = self.add_string(heap, name)?;
                self.builder().emit(Op::StoreVar, index);
            }
            Expr::Member {
                object,
                property,
                computed,
            } => {
                self.builder().emit_op(Op::Dup);
                self.compile_expr(heap, object)?;
                if *computed {
                    self.compile_expr(heap, property)?;
                    self.builder().emit_op(Op::SetPropComputed);
                } else {
                    let name = property_name(property)
                        .ok_or_else(|| self.error("invalid assignment target"))?;
                    let index = self.add_string(heap, &name)?;
                    self.builder().emit(Op::SetProp, index);
                }
            }
            _ => return Err(self.error("invalid assignment target")),
        }
        Ok(())
    }

    /// Compiles a function body into a nested chunk and returns its
    /// index in the enclosing chunk's function table.
    fn compile_function(&mut self, heap: &mut Heap, def: &FunctionDef) -> Result<u32, JsError> {
        let mut builder = ChunkBuilder::for_function(def.name.clone(), def.params.clone());
        builder.set_local_count(count_locals(&def.body));
        self.builders.push(builder);
        self.loops.push(Vec::new());

        let result = (|| -> Result<(), JsError> {
            for stmt in &def.body {
                self.compile_stmt(heap, stmt, false)?;
            }
            // Implicit `return undefined` at the end of the body.
            self.builder().emit_op(Op::PushUndefined);
            self.builder().emit_op(Op::Return);
            Ok(())
        })();

        self.loops.pop();
        let builder = match self.builders.pop() {
            Some(builder) => builder,
            None => unreachable!("builder stack underflow"),
        };
        result?;
        self.builder().add_function(builder.finish())
    }
}

/// Number of variables declared directly in a statement list,
/// including nested blocks and control-flow bodies.
fn count_locals(body: &[Stmt]) -> usize {
    body.iter().map(count_locals_stmt).sum()
}

fn count_locals_stmt(stmt: &Stmt) -> usize {
    match &stmt.kind {
        StmtKind::VarDecl { declarations, .. } => declarations.len(),
        StmtKind::Block(body) => count_locals(body),
        StmtKind::If {
            consequent,
            alternate,
            ..
        } => {
            count_locals_stmt(consequent)
                + alternate.as_deref().map(count_locals_stmt).unwrap_or(0)
        }
        StmtKind::While { body, .. } => count_locals_stmt(body),
        StmtKind::FunctionDecl(_) => 1,
        _ => 0,
    }
}

fn property_name(property: &Expr) -> Option<String> {
    match property {
        Expr::String(s) => Some(s.clone()),
        Expr::Identifier(name) => Some(name.clone()),
        _ => None,
    }
}
