//! Chunk builder
//!
//! Emission helper with pool deduplication and jump back-patching.
//! Jumps are emitted with a placeholder operand and patched to an
//! absolute instruction index once the target is known.

use rustc_hash::FxHashMap;

use crate::ast::Span;
use crate::compiler::bytecode::{Chunk, Instruction, Op};
use crate::error::JsError;
use crate::gc::{GcRef, RootProvider};
use crate::value::Value;

/// A jump emitted with a placeholder target, to be patched later.
#[derive(Debug, Clone, Copy)]
pub struct JumpPlaceholder {
    pub instruction_index: usize,
}

pub struct ChunkBuilder {
    chunk: Chunk,
    /// Content-keyed dedup for the string pool.
    string_map: FxHashMap<String, u32>,
    /// Content-keyed dedup for string constants.
    string_const_map: FxHashMap<String, u32>,
    /// Bit-pattern-keyed dedup for number constants.
    number_map: FxHashMap<u64, u32>,
    span: Span,
}

impl ChunkBuilder {
    pub fn new(name: Option<String>) -> Self {
        Self {
            chunk: Chunk::new(name),
            string_map: FxHashMap::default(),
            string_const_map: FxHashMap::default(),
            number_map: FxHashMap::default(),
            span: Span::default(),
        }
    }

    pub fn for_function(name: Option<String>, params: Vec<String>) -> Self {
        let mut builder = Self::new(name);
        builder.chunk.param_count = params.len();
        builder.chunk.param_names = params;
        builder
    }

    /// Source position attached to subsequently emitted instructions.
    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn emit(&mut self, op: Op, operand: u32) -> usize {
        let index = self.chunk.code.len();
        self.chunk.code.push(Instruction::new(op, operand));
        self.chunk.debug.push(self.span);
        index
    }

    pub fn emit_op(&mut self, op: Op) -> usize {
        self.emit(op, 0)
    }

    /// Emits a jump with a placeholder target.
    pub fn emit_jump(&mut self, op: Op) -> JumpPlaceholder {
        let instruction_index = self.emit(op, u32::MAX);
        JumpPlaceholder { instruction_index }
    }

    /// Patches a placeholder to jump to the current instruction count.
    pub fn patch_jump(&mut self, placeholder: JumpPlaceholder) {
        let target = self.chunk.code.len() as u32;
        self.patch_jump_to(placeholder, target);
    }

    pub fn patch_jump_to(&mut self, placeholder: JumpPlaceholder, target: u32) {
        if let Some(instruction) = self.chunk.code.get_mut(placeholder.instruction_index) {
            instruction.operand = target;
        }
    }

    pub fn current_offset(&self) -> usize {
        self.chunk.code.len()
    }

    /// Appends a constant; the pool is append-only.
    pub fn add_constant(&mut self, value: Value) -> Result<u32, JsError> {
        if self.chunk.constants.len() >= u32::MAX as usize {
            return Err(JsError::internal_error("constant pool overflow"));
        }
        let index = self.chunk.constants.len() as u32;
        self.chunk.constants.push(value);
        Ok(index)
    }

    /// Adds a number constant, deduplicating on bit pattern.
    pub fn add_number(&mut self, n: f64) -> Result<u32, JsError> {
        if let Some(&index) = self.number_map.get(&n.to_bits()) {
            return Ok(index);
        }
        let index = self.add_constant(Value::Number(n))?;
        self.number_map.insert(n.to_bits(), index);
        Ok(index)
    }

    /// Adds an interned heap string to the string pool, deduplicating
    /// by content, and returns its pool index.
    pub fn add_string(&mut self, text: &str, r: GcRef) -> Result<u32, JsError> {
        if let Some(&index) = self.string_map.get(text) {
            return Ok(index);
        }
        if self.chunk.strings.len() >= u32::MAX as usize {
            return Err(JsError::internal_error("string pool overflow"));
        }
        let index = self.chunk.strings.len() as u32;
        self.chunk.strings.push(r);
        self.string_map.insert(text.to_string(), index);
        Ok(index)
    }

    /// Pool index of an already-added string constant, if any.
    pub fn lookup_string_constant(&self, text: &str) -> Option<u32> {
        self.string_const_map.get(text).copied()
    }

    /// Adds a heap string to the constant pool, deduplicating by
    /// content.
    pub fn add_string_constant(&mut self, text: &str, r: GcRef) -> Result<u32, JsError> {
        if let Some(&index) = self.string_const_map.get(text) {
            return Ok(index);
        }
        let index = self.add_constant(Value::String(r))?;
        self.string_const_map.insert(text.to_string(), index);
        Ok(index)
    }

    /// Adds a nested function body and returns its table index.
    pub fn add_function(&mut self, chunk: Chunk) -> Result<u32, JsError> {
        if self.chunk.functions.len() >= u32::MAX as usize {
            return Err(JsError::internal_error("function table overflow"));
        }
        let index = self.chunk.functions.len() as u32;
        self.chunk.functions.push(std::rc::Rc::new(chunk));
        Ok(index)
    }

    pub fn set_local_count(&mut self, count: usize) {
        self.chunk.local_count = count;
    }

    pub fn finish(self) -> Chunk {
        self.chunk
    }
}

impl RootProvider for ChunkBuilder {
    fn visit_roots(&self, visitor: &mut dyn FnMut(Value)) {
        self.chunk.visit_values(visitor);
    }
}

/// The compiler's builder stack: pools of every chunk under
/// construction stay alive across allocations.
impl RootProvider for Vec<ChunkBuilder> {
    fn visit_roots(&self, visitor: &mut dyn FnMut(Value)) {
        for builder in self {
            builder.visit_roots(visitor);
        }
    }
}
