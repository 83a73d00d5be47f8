//! A lightweight, embeddable engine for a JavaScript-like language
//!
//! Source text compiles to stack-based bytecode and runs on a small
//! VM; all dynamic values live in a generational mark-and-sweep heap
//! owned by the [`Runtime`]. Hosts register native callbacks, read and
//! write global bindings, and pin values across collections with
//! roots.
//!
//! # Example
//!
//! ```
//! use jsrun::{Runtime, Value};
//!
//! let runtime = Runtime::new();
//! let mut ctx = runtime.new_context().unwrap();
//!
//! let result = ctx.eval("var x = 2 + 3 * 4; x", "<example>").unwrap();
//! assert_eq!(result, Value::Number(14.0));
//!
//! let greeting = ctx.eval("'hi' + ' there'", "<example>").unwrap();
//! assert_eq!(ctx.to_display_string(greeting), "hi there");
//! ```

pub mod array;
pub mod ast;
pub mod compiler;
pub mod error;
pub mod gc;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod string;
pub mod value;
pub mod vm;

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::compiler::Compiler;
use crate::gc::NoRoots;
use crate::parser::Parser;
use crate::vm::{Vm, VmState};

pub use crate::error::{ErrorCode, JsError};
pub use crate::gc::{GcRef, GcStats, Heap, RootId, RootProvider, WeakRef};
pub use crate::object::PropertyDescriptor;
pub use crate::value::{NativeFunction, Value};

/// Engine version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Top-level container owning the managed heap (collector plus the
/// interned-string table). Contexts created from a runtime share its
/// heap; the host serialises access.
pub struct Runtime {
    heap: Rc<RefCell<Heap>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            heap: Rc::new(RefCell::new(Heap::new())),
        }
    }

    /// Creates an execution context with its own VM and global object.
    pub fn new_context(&self) -> Result<Context, JsError> {
        let (global, global_root) = {
            let mut heap = self.heap.borrow_mut();
            let global = heap.alloc_object(&NoRoots)?;
            let global_root = heap.add_root(Value::Object(global));
            (global, global_root)
        };
        Ok(Context {
            heap: Rc::clone(&self.heap),
            vm: Vm::new(),
            global,
            global_root,
            error: None,
        })
    }

    /// Forces a full collection.
    pub fn collect(&self) {
        self.heap.borrow_mut().collect_full(&NoRoots);
    }

    /// Bytes currently retained by live heap objects.
    pub fn memory_usage(&self) -> usize {
        self.heap.borrow().memory_usage()
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.borrow().stats()
    }

    pub fn set_max_heap_size(&self, limit: Option<usize>) {
        self.heap.borrow_mut().set_max_heap_size(limit);
    }

    pub fn set_young_threshold(&self, threshold: usize) {
        self.heap.borrow_mut().set_young_threshold(threshold);
    }
}

/// An execution context: a VM, a global object, and a one-slot error
/// register for the embedding API.
pub struct Context {
    pub(crate) heap: Rc<RefCell<Heap>>,
    pub(crate) vm: Vm,
    pub(crate) global: GcRef,
    global_root: RootId,
    error: Option<(ErrorCode, String)>,
}

impl Context {
    // ── Script execution ───────────────────────────────────────────

    /// Parses, compiles and executes `source`, returning the script's
    /// completion value. `filename` is used in stored error messages.
    pub fn eval(&mut self, source: &str, filename: &str) -> Result<Value, JsError> {
        self.error = None;
        let result = self.eval_inner(source);
        if let Err(e) = &result {
            self.error = Some((e.code(), format!("{} ({})", e, filename)));
        }
        result
    }

    fn eval_inner(&mut self, source: &str) -> Result<Value, JsError> {
        if self.vm.state() == VmState::Running {
            return Err(JsError::runtime_error("the VM is not re-entrant"));
        }
        let program = Parser::new(source)?.parse_program()?;
        let chunk = {
            let mut heap = self.heap.borrow_mut();
            Compiler::compile_program(&mut heap, &program)?
        };
        self.execute_chunk(chunk, Value::Object(self.global))
    }

    /// Reads a file and evaluates its contents.
    pub fn eval_file(&mut self, path: &str) -> Result<Value, JsError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            let error = JsError::runtime_error(format!("cannot read {}: {}", path, e));
            self.error = Some((error.code(), error.to_string()));
            error
        })?;
        self.eval(&source, path)
    }

    /// Executes an already-built bytecode chunk, returning the topmost
    /// stack value (or undefined when the stack is empty).
    pub fn execute(&mut self, chunk: Rc<compiler::bytecode::Chunk>) -> Result<Value, JsError> {
        self.error = None;
        let result = self.execute_chunk(chunk, Value::Object(self.global));
        if let Err(e) = &result {
            self.error = Some((e.code(), e.to_string()));
        }
        result
    }

    /// Calls a function value from the host.
    pub fn call_function(
        &mut self,
        function: Value,
        this: Value,
        args: &[Value],
    ) -> Result<Value, JsError> {
        let result = self.call_value(function, this, args);
        if let Err(e) = &result {
            self.error = Some((e.code(), e.to_string()));
        }
        result
    }

    // ── Value constructors ─────────────────────────────────────────

    pub fn new_string(&mut self, text: &str) -> Result<Value, JsError> {
        let r = self.heap.borrow_mut().alloc_string(text, &self.vm)?;
        Ok(Value::String(r))
    }

    /// Returns the canonical interned string for `text`; repeated
    /// calls yield the identical handle.
    pub fn intern_string(&mut self, text: &str) -> Result<Value, JsError> {
        let r = self.heap.borrow_mut().intern(text, &self.vm)?;
        Ok(Value::String(r))
    }

    pub fn new_object(&mut self) -> Result<Value, JsError> {
        let r = self.heap.borrow_mut().alloc_object(&self.vm)?;
        Ok(Value::Object(r))
    }

    pub fn new_array(&mut self) -> Result<Value, JsError> {
        let r = self.heap.borrow_mut().alloc_array(0, &self.vm)?;
        Ok(Value::Array(r))
    }

    // ── Coercions ──────────────────────────────────────────────────

    pub fn to_boolean(&self, value: Value) -> bool {
        value::to_boolean(&self.heap.borrow(), value)
    }

    pub fn to_number(&self, value: Value) -> f64 {
        value::to_number(&self.heap.borrow(), value)
    }

    /// String form without allocating on the managed heap.
    pub fn to_display_string(&self, value: Value) -> String {
        value::display_string(&self.heap.borrow(), value)
    }

    /// String coercion, allocating a heap string.
    pub fn to_js_string(&mut self, value: Value) -> Result<Value, JsError> {
        let mut heap = self.heap.borrow_mut();
        let r = value::to_string(&mut heap, value, &self.vm)?;
        Ok(Value::String(r))
    }

    pub fn type_of(&self, value: Value) -> &'static str {
        value::type_name(value)
    }

    pub fn strict_equals(&self, a: Value, b: Value) -> bool {
        value::strict_equals(&self.heap.borrow(), a, b)
    }

    // ── Strings ────────────────────────────────────────────────────

    fn string_ref(&self, value: Value) -> Result<GcRef, JsError> {
        match value {
            Value::String(r) => Ok(r),
            _ => Err(JsError::type_error("value is not a string")),
        }
    }

    pub fn string_length(&self, s: Value) -> Result<usize, JsError> {
        let r = self.string_ref(s)?;
        Ok(self.heap.borrow().string(r)?.len())
    }

    /// Byte-wise comparison of two strings.
    pub fn string_compare(&self, a: Value, b: Value) -> Result<Ordering, JsError> {
        let a = self.string_ref(a)?;
        let b = self.string_ref(b)?;
        string::compare(&self.heap.borrow(), a, b)
    }

    pub fn string_concat(&mut self, a: Value, b: Value) -> Result<Value, JsError> {
        let a = self.string_ref(a)?;
        let b = self.string_ref(b)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::String(string::concat(&mut heap, a, b, &self.vm)?))
    }

    pub fn string_substring(
        &mut self,
        s: Value,
        start: usize,
        length: usize,
    ) -> Result<Value, JsError> {
        let r = self.string_ref(s)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::String(string::substring(
            &mut heap, r, start, length, &self.vm,
        )?))
    }

    pub fn string_to_lower(&mut self, s: Value) -> Result<Value, JsError> {
        let r = self.string_ref(s)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::String(string::to_lower(&mut heap, r, &self.vm)?))
    }

    pub fn string_to_upper(&mut self, s: Value) -> Result<Value, JsError> {
        let r = self.string_ref(s)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::String(string::to_upper(&mut heap, r, &self.vm)?))
    }

    pub fn string_trim(&mut self, s: Value) -> Result<Value, JsError> {
        let r = self.string_ref(s)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::String(string::trim(&mut heap, r, &self.vm)?))
    }

    /// Byte offset of `needle` in `s` at or after `from`, if present.
    pub fn string_index_of(
        &self,
        s: Value,
        needle: Value,
        from: usize,
    ) -> Result<Option<usize>, JsError> {
        let s = self.string_ref(s)?;
        let needle = self.string_ref(needle)?;
        string::index_of(&self.heap.borrow(), s, needle, from)
    }

    /// Splits around a separator into an array of strings; an empty
    /// separator splits per character.
    pub fn string_split(&mut self, s: Value, separator: Value) -> Result<Value, JsError> {
        let s = self.string_ref(s)?;
        let separator = self.string_ref(separator)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::Array(string::split(
            &mut heap, s, separator, &self.vm,
        )?))
    }

    /// JSON-style escaping of quotes, backslashes and control
    /// characters.
    pub fn string_escape(&mut self, s: Value) -> Result<Value, JsError> {
        let r = self.string_ref(s)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::String(string::escape(&mut heap, r, &self.vm)?))
    }

    // ── Objects ────────────────────────────────────────────────────

    pub fn global_object(&self) -> Value {
        Value::Object(self.global)
    }

    /// Reads an own property; missing properties are undefined.
    pub fn get_property(&self, object: Value, key: &str) -> Result<Value, JsError> {
        let Value::Object(r) = object else {
            return Err(JsError::type_error("cannot get property of a non-object"));
        };
        let heap = self.heap.borrow();
        Ok(object::get_property(&heap, r, key)?.unwrap_or(Value::Undefined))
    }

    pub fn set_property(&mut self, object: Value, key: &str, value: Value) -> Result<(), JsError> {
        let Value::Object(r) = object else {
            return Err(JsError::type_error("cannot set property on a non-object"));
        };
        let mut heap = self.heap.borrow_mut();
        object::set_property(&mut heap, r, key, value, &self.vm)?;
        Ok(())
    }

    pub fn define_property(
        &mut self,
        object: Value,
        key: &str,
        desc: PropertyDescriptor,
    ) -> Result<bool, JsError> {
        let Value::Object(r) = object else {
            return Err(JsError::type_error("cannot define property on a non-object"));
        };
        let mut heap = self.heap.borrow_mut();
        object::define_property(&mut heap, r, key, desc, &self.vm)
    }

    pub fn has_property(&self, object: Value, key: &str) -> Result<bool, JsError> {
        let Value::Object(r) = object else {
            return Err(JsError::type_error("cannot inspect a non-object"));
        };
        object::has_property(&self.heap.borrow(), r, key)
    }

    /// Deletes an own property; fails only on non-configurable
    /// properties.
    pub fn delete_property(&mut self, object: Value, key: &str) -> Result<bool, JsError> {
        let Value::Object(r) = object else {
            return Err(JsError::type_error("cannot delete from a non-object"));
        };
        object::delete_property(&mut self.heap.borrow_mut(), r, key)
    }

    /// Enumerable own property names, in insertion order.
    pub fn property_names(&self, object: Value) -> Result<Vec<String>, JsError> {
        let Value::Object(r) = object else {
            return Err(JsError::type_error("cannot enumerate a non-object"));
        };
        object::property_names(&self.heap.borrow(), r)
    }

    fn object_ref(&self, value: Value) -> Result<GcRef, JsError> {
        match value {
            Value::Object(r) => Ok(r),
            _ => Err(JsError::type_error("value is not an object")),
        }
    }

    /// One-way transition: the object permanently refuses new
    /// properties.
    pub fn prevent_extensions(&mut self, object: Value) -> Result<(), JsError> {
        let r = self.object_ref(object)?;
        self.heap.borrow_mut().object_mut(r)?.prevent_extensions();
        Ok(())
    }

    pub fn is_extensible(&self, object: Value) -> Result<bool, JsError> {
        let r = self.object_ref(object)?;
        Ok(self.heap.borrow().object(r)?.is_extensible())
    }

    pub fn seal(&mut self, object: Value) -> Result<(), JsError> {
        let r = self.object_ref(object)?;
        self.heap.borrow_mut().object_mut(r)?.seal();
        Ok(())
    }

    pub fn freeze(&mut self, object: Value) -> Result<(), JsError> {
        let r = self.object_ref(object)?;
        self.heap.borrow_mut().object_mut(r)?.freeze();
        Ok(())
    }

    pub fn is_sealed(&self, object: Value) -> Result<bool, JsError> {
        let r = self.object_ref(object)?;
        Ok(self.heap.borrow().object(r)?.is_sealed())
    }

    pub fn is_frozen(&self, object: Value) -> Result<bool, JsError> {
        let r = self.object_ref(object)?;
        Ok(self.heap.borrow().object(r)?.is_frozen())
    }

    /// Shallow clone: the property list is copied, values are shared.
    pub fn clone_object(&mut self, object: Value) -> Result<Value, JsError> {
        let r = self.object_ref(object)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::Object(object::clone_object(&mut heap, r, &self.vm)?))
    }

    /// The object's prototype slot. Stored and traced, but not
    /// consulted by property lookup.
    pub fn get_prototype(&self, object: Value) -> Result<Value, JsError> {
        let r = self.object_ref(object)?;
        let heap = self.heap.borrow();
        Ok(match heap.object(r)?.prototype {
            Some(proto) => Value::Object(proto),
            None => Value::Null,
        })
    }

    pub fn set_prototype(&mut self, object: Value, prototype: Value) -> Result<(), JsError> {
        let r = self.object_ref(object)?;
        let proto = match prototype {
            Value::Null | Value::Undefined => None,
            Value::Object(p) => Some(p),
            _ => return Err(JsError::type_error("prototype must be an object or null")),
        };
        self.heap.borrow_mut().object_mut(r)?.prototype = proto;
        Ok(())
    }

    // ── Globals ────────────────────────────────────────────────────

    pub fn get_global(&self, name: &str) -> Result<Value, JsError> {
        let heap = self.heap.borrow();
        Ok(object::get_property(&heap, self.global, name)?.unwrap_or(Value::Undefined))
    }

    pub fn set_global(&mut self, name: &str, value: Value) -> Result<(), JsError> {
        let mut heap = self.heap.borrow_mut();
        object::set_property(&mut heap, self.global, name, value, &self.vm)?;
        Ok(())
    }

    // ── Arrays ─────────────────────────────────────────────────────

    pub fn array_length(&self, array: Value) -> Result<usize, JsError> {
        let Value::Array(r) = array else {
            return Err(JsError::type_error("value is not an array"));
        };
        Ok(self.heap.borrow().array(r)?.length())
    }

    pub fn array_get(&self, array: Value, index: usize) -> Result<Value, JsError> {
        let Value::Array(r) = array else {
            return Err(JsError::type_error("value is not an array"));
        };
        Ok(self.heap.borrow().array(r)?.get(index))
    }

    pub fn array_set(&mut self, array: Value, index: usize, value: Value) -> Result<(), JsError> {
        let Value::Array(r) = array else {
            return Err(JsError::type_error("value is not an array"));
        };
        let mut heap = self.heap.borrow_mut();
        heap.array_mut(r)?.set(index, value);
        heap.refresh_bytes(r);
        Ok(())
    }

    pub fn array_push(&mut self, array: Value, value: Value) -> Result<(), JsError> {
        let Value::Array(r) = array else {
            return Err(JsError::type_error("value is not an array"));
        };
        let mut heap = self.heap.borrow_mut();
        heap.array_mut(r)?.push(value);
        heap.refresh_bytes(r);
        Ok(())
    }

    pub fn array_pop(&mut self, array: Value) -> Result<Value, JsError> {
        let Value::Array(r) = array else {
            return Err(JsError::type_error("value is not an array"));
        };
        let mut heap = self.heap.borrow_mut();
        let value = heap.array_mut(r)?.pop();
        heap.refresh_bytes(r);
        Ok(value)
    }

    fn array_ref(&self, value: Value) -> Result<GcRef, JsError> {
        match value {
            Value::Array(r) => Ok(r),
            _ => Err(JsError::type_error("value is not an array")),
        }
    }

    /// Sets the length: extension pads with undefined, truncation
    /// clears.
    pub fn array_set_length(&mut self, array: Value, length: usize) -> Result<(), JsError> {
        let r = self.array_ref(array)?;
        let mut heap = self.heap.borrow_mut();
        heap.array_mut(r)?.set_length(length);
        heap.refresh_bytes(r);
        Ok(())
    }

    /// Prepends one element; O(length).
    pub fn array_unshift(&mut self, array: Value, value: Value) -> Result<(), JsError> {
        let r = self.array_ref(array)?;
        let mut heap = self.heap.borrow_mut();
        heap.array_mut(r)?.unshift(value);
        heap.refresh_bytes(r);
        Ok(())
    }

    /// Removes and returns the first element; O(length).
    pub fn array_shift(&mut self, array: Value) -> Result<Value, JsError> {
        let r = self.array_ref(array)?;
        let mut heap = self.heap.borrow_mut();
        let value = heap.array_mut(r)?.shift();
        heap.refresh_bytes(r);
        Ok(value)
    }

    pub fn array_reverse(&mut self, array: Value) -> Result<(), JsError> {
        let r = self.array_ref(array)?;
        self.heap.borrow_mut().array_mut(r)?.reverse();
        Ok(())
    }

    /// First index holding a strictly-equal element at or after `from`.
    pub fn array_index_of(
        &self,
        array: Value,
        needle: Value,
        from: usize,
    ) -> Result<Option<usize>, JsError> {
        let r = self.array_ref(array)?;
        array::index_of(&self.heap.borrow(), r, needle, from)
    }

    pub fn array_last_index_of(&self, array: Value, needle: Value) -> Result<Option<usize>, JsError> {
        let r = self.array_ref(array)?;
        array::last_index_of(&self.heap.borrow(), r, needle)
    }

    pub fn array_includes(&self, array: Value, needle: Value) -> Result<bool, JsError> {
        let r = self.array_ref(array)?;
        array::includes(&self.heap.borrow(), r, needle)
    }

    /// Copies `[start, end)` into a new array; negative indices count
    /// from the end.
    pub fn array_slice(&mut self, array: Value, start: i64, end: i64) -> Result<Value, JsError> {
        let r = self.array_ref(array)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::Array(array::slice(&mut heap, r, start, end, &self.vm)?))
    }

    /// Removes `delete_count` elements at `start` and inserts `items`;
    /// returns the removed elements as a new array.
    pub fn array_splice(
        &mut self,
        array: Value,
        start: usize,
        delete_count: usize,
        items: &[Value],
    ) -> Result<Value, JsError> {
        let r = self.array_ref(array)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::Array(array::splice(
            &mut heap,
            r,
            start,
            delete_count,
            items,
            &self.vm,
        )?))
    }

    pub fn array_concat(&mut self, a: Value, b: Value) -> Result<Value, JsError> {
        let a = self.array_ref(a)?;
        let b = self.array_ref(b)?;
        let mut heap = self.heap.borrow_mut();
        Ok(Value::Array(array::concat(&mut heap, a, b, &self.vm)?))
    }

    /// Joins the elements' string forms with `separator`.
    pub fn array_join(&self, array: Value, separator: &str) -> Result<String, JsError> {
        let r = self.array_ref(array)?;
        array::join(&self.heap.borrow(), r, separator)
    }

    // ── Native callbacks ───────────────────────────────────────────

    /// Registers a native callback as a property of `object`.
    pub fn define_function(
        &mut self,
        object: Value,
        name: &str,
        func: NativeFunction,
    ) -> Result<(), JsError> {
        let Value::Object(r) = object else {
            return Err(JsError::type_error("cannot define function on a non-object"));
        };
        let mut heap = self.heap.borrow_mut();
        let name_ref = heap.intern(name, &self.vm)?;
        heap.push_root(Value::String(name_ref));
        let function = heap.alloc_function(
            crate::value::JsFunction::native(Some(name_ref), func),
            &self.vm,
        );
        heap.pop_roots(1);
        let function = function?;
        object::set_property(&mut heap, r, name, Value::Function(function), &self.vm)?;
        Ok(())
    }

    /// Registers a native callback on the global object.
    pub fn define_global_function(
        &mut self,
        name: &str,
        func: NativeFunction,
    ) -> Result<(), JsError> {
        self.define_function(Value::Object(self.global), name, func)
    }

    // ── Error inspection ───────────────────────────────────────────

    /// Message of the most recent failed operation, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_ref().map(|(_, message)| message.as_str())
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error
            .as_ref()
            .map(|(code, _)| *code)
            .unwrap_or(ErrorCode::Ok)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // ── Memory ─────────────────────────────────────────────────────

    /// Forces a full collection.
    pub fn gc(&mut self) {
        self.heap.borrow_mut().collect_full(&self.vm);
    }

    /// Forces a minor (young-generation) collection.
    pub fn gc_young(&mut self) {
        self.heap.borrow_mut().collect_young(&self.vm);
    }

    /// Advances the incremental collector by one phase step.
    pub fn gc_incremental(&mut self, budget_us: u64) {
        self.heap.borrow_mut().collect_incremental(budget_us, &self.vm);
    }

    pub fn memory_usage(&self) -> usize {
        self.heap.borrow().memory_usage()
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.borrow().stats()
    }

    /// Pins a value as a strong root until [`Context::remove_root`].
    pub fn add_root(&mut self, value: Value) -> RootId {
        self.heap.borrow_mut().add_root(value)
    }

    pub fn remove_root(&mut self, id: RootId) {
        self.heap.borrow_mut().remove_root(id);
    }

    /// Creates a weak reference; see [`Heap::create_weak_ref`].
    pub fn create_weak_ref(
        &mut self,
        target: Value,
        callback: Option<Box<dyn FnMut()>>,
    ) -> Result<WeakRef, JsError> {
        self.heap.borrow_mut().create_weak_ref(target, callback)
    }

    /// The weak target, or `None` once it has been collected.
    pub fn weak_get(&self, weak: WeakRef) -> Option<Value> {
        self.heap.borrow().weak_get(weak)
    }

    /// Drops a weak reference without waiting for its target to die.
    pub fn release_weak_ref(&mut self, weak: WeakRef) {
        self.heap.borrow_mut().release_weak_ref(weak);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.heap.borrow_mut().remove_root(self.global_root);
    }
}
