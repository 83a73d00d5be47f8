//! Arrays
//!
//! A contiguous value buffer with geometric growth. Holes created by
//! out-of-range writes or length extension are `undefined`.

use crate::error::JsError;
use crate::gc::{GcRef, Heap, RootProvider};
use crate::value::{self, Value};

/// Array payload stored behind a [`GcRef`].
#[derive(Debug, Default)]
pub struct JsArray {
    pub elements: Vec<Value>,
}

impl JsArray {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    pub fn length(&self) -> usize {
        self.elements.len()
    }

    /// Out-of-range reads yield `undefined`.
    pub fn get(&self, index: usize) -> Value {
        self.elements.get(index).copied().unwrap_or(Value::Undefined)
    }

    /// Writing past the end grows the array, filling the gap with
    /// `undefined`.
    pub fn set(&mut self, index: usize, value: Value) {
        if index >= self.elements.len() {
            self.elements.resize(index + 1, Value::Undefined);
        }
        self.elements[index] = value;
    }

    /// Extension pads with `undefined`; truncation clears the dropped
    /// slots.
    pub fn set_length(&mut self, new_length: usize) {
        self.elements.resize(new_length, Value::Undefined);
    }

    pub fn push(&mut self, value: Value) {
        self.elements.push(value);
    }

    pub fn pop(&mut self) -> Value {
        self.elements.pop().unwrap_or(Value::Undefined)
    }

    /// Prepends one element; O(length) move.
    pub fn unshift(&mut self, value: Value) {
        self.elements.insert(0, value);
    }

    /// Removes and returns the first element; O(length) move.
    pub fn shift(&mut self) -> Value {
        if self.elements.is_empty() {
            Value::Undefined
        } else {
            self.elements.remove(0)
        }
    }

    pub fn reverse(&mut self) {
        self.elements.reverse();
    }
}

/// Resolves a possibly-negative index relative to `length`, clamped to
/// `[0, length]`.
fn resolve_index(index: i64, length: usize) -> usize {
    if index < 0 {
        let abs = index.unsigned_abs() as usize;
        length.saturating_sub(abs)
    } else {
        (index as usize).min(length)
    }
}

/// First index holding a strictly-equal element at or after `from`.
pub fn index_of(heap: &Heap, arr: GcRef, needle: Value, from: usize) -> Result<Option<usize>, JsError> {
    let array = heap.array(arr)?;
    for (i, element) in array.elements.iter().enumerate().skip(from) {
        if value::strict_equals(heap, *element, needle) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Last index holding a strictly-equal element.
pub fn last_index_of(heap: &Heap, arr: GcRef, needle: Value) -> Result<Option<usize>, JsError> {
    let array = heap.array(arr)?;
    for (i, element) in array.elements.iter().enumerate().rev() {
        if value::strict_equals(heap, *element, needle) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

pub fn includes(heap: &Heap, arr: GcRef, needle: Value) -> Result<bool, JsError> {
    Ok(index_of(heap, arr, needle, 0)?.is_some())
}

/// Copies `[start, end)` into a new array. Negative indices count from
/// the end.
pub fn slice(
    heap: &mut Heap,
    arr: GcRef,
    start: i64,
    end: i64,
    roots: &dyn RootProvider,
) -> Result<GcRef, JsError> {
    let elements: Vec<Value> = {
        let array = heap.array(arr)?;
        let len = array.length();
        let start = resolve_index(start, len);
        let end = resolve_index(end, len);
        if start >= end {
            Vec::new()
        } else {
            array.elements[start..end].to_vec()
        }
    };
    alloc_from(heap, arr, elements, roots)
}

/// Removes `delete_count` elements at `start`, inserting `items` in
/// their place. Returns a new array holding the removed elements.
pub fn splice(
    heap: &mut Heap,
    arr: GcRef,
    start: usize,
    delete_count: usize,
    items: &[Value],
    roots: &dyn RootProvider,
) -> Result<GcRef, JsError> {
    let removed: Vec<Value> = {
        let array = heap.array_mut(arr)?;
        let len = array.length();
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);
        array
            .elements
            .splice(start..start + delete_count, items.iter().copied())
            .collect()
    };
    heap.refresh_bytes(arr);
    alloc_from(heap, arr, removed, roots)
}

/// Concatenates two arrays into a new one.
pub fn concat(
    heap: &mut Heap,
    a: GcRef,
    b: GcRef,
    roots: &dyn RootProvider,
) -> Result<GcRef, JsError> {
    let mut elements = heap.array(a)?.elements.clone();
    elements.extend_from_slice(&heap.array(b)?.elements);
    heap.push_root(Value::Array(a));
    heap.push_root(Value::Array(b));
    let result = alloc_from_pinned(heap, elements, roots);
    heap.pop_roots(2);
    result
}

/// Joins the elements' string forms with `separator`.
pub fn join(heap: &Heap, arr: GcRef, separator: &str) -> Result<String, JsError> {
    let array = heap.array(arr)?;
    let mut out = String::new();
    for (i, element) in array.elements.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(&value::display_string(heap, *element));
    }
    Ok(out)
}

fn alloc_from(
    heap: &mut Heap,
    source: GcRef,
    elements: Vec<Value>,
    roots: &dyn RootProvider,
) -> Result<GcRef, JsError> {
    heap.push_root(Value::Array(source));
    let result = alloc_from_pinned(heap, elements, roots);
    heap.pop_roots(1);
    result
}

fn alloc_from_pinned(
    heap: &mut Heap,
    elements: Vec<Value>,
    roots: &dyn RootProvider,
) -> Result<GcRef, JsError> {
    for element in &elements {
        heap.push_root(*element);
    }
    let pinned = elements.len();
    let result = heap.alloc_array(elements.len(), roots);
    heap.pop_roots(pinned);
    let arr = result?;
    heap.array_mut(arr)?.elements = elements;
    heap.refresh_bytes(arr);
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::NoRoots;

    #[test]
    fn test_set_past_length_fills_holes() {
        let mut a = JsArray::new();
        a.set(3, Value::Number(1.0));
        assert_eq!(a.length(), 4);
        assert_eq!(a.get(0), Value::Undefined);
        assert_eq!(a.get(3), Value::Number(1.0));
        a.set_length(2);
        assert_eq!(a.length(), 2);
        assert_eq!(a.get(3), Value::Undefined);
    }

    #[test]
    fn test_push_pop_shift_unshift() {
        let mut a = JsArray::new();
        a.push(Value::Number(1.0));
        a.push(Value::Number(2.0));
        a.unshift(Value::Number(0.0));
        assert_eq!(a.length(), 3);
        assert_eq!(a.shift(), Value::Number(0.0));
        assert_eq!(a.pop(), Value::Number(2.0));
        assert_eq!(a.pop(), Value::Number(1.0));
        assert_eq!(a.pop(), Value::Undefined);
    }

    #[test]
    fn test_slice_negative_indices() {
        let mut heap = Heap::new();
        let arr = heap.alloc_array(0, &NoRoots).unwrap();
        for i in 0..5 {
            heap.array_mut(arr).unwrap().push(Value::Number(i as f64));
        }
        let s = slice(&mut heap, arr, -2, 5, &NoRoots).unwrap();
        let sliced = heap.array(s).unwrap();
        assert_eq!(sliced.length(), 2);
        assert_eq!(sliced.get(0), Value::Number(3.0));
        assert_eq!(sliced.get(1), Value::Number(4.0));
    }

    #[test]
    fn test_splice_remove_insert() {
        let mut heap = Heap::new();
        let arr = heap.alloc_array(0, &NoRoots).unwrap();
        for i in 0..4 {
            heap.array_mut(arr).unwrap().push(Value::Number(i as f64));
        }
        let removed = splice(
            &mut heap,
            arr,
            1,
            2,
            &[Value::Number(9.0)],
            &NoRoots,
        )
        .unwrap();
        assert_eq!(heap.array(removed).unwrap().length(), 2);
        let a = heap.array(arr).unwrap();
        assert_eq!(a.length(), 3);
        assert_eq!(a.get(0), Value::Number(0.0));
        assert_eq!(a.get(1), Value::Number(9.0));
        assert_eq!(a.get(2), Value::Number(3.0));
    }

    #[test]
    fn test_join() {
        let mut heap = Heap::new();
        let arr = heap.alloc_array(0, &NoRoots).unwrap();
        heap.array_mut(arr).unwrap().push(Value::Number(1.0));
        heap.array_mut(arr).unwrap().push(Value::Boolean(true));
        heap.array_mut(arr).unwrap().push(Value::Null);
        assert_eq!(join(&heap, arr, ",").unwrap(), "1,true,null");
    }

    #[test]
    fn test_index_of_strict_equality() {
        let mut heap = Heap::new();
        let arr = heap.alloc_array(0, &NoRoots).unwrap();
        heap.array_mut(arr).unwrap().push(Value::Number(1.0));
        heap.array_mut(arr).unwrap().push(Value::Number(f64::NAN));
        heap.array_mut(arr).unwrap().push(Value::Number(1.0));
        assert_eq!(index_of(&heap, arr, Value::Number(1.0), 0).unwrap(), Some(0));
        assert_eq!(index_of(&heap, arr, Value::Number(1.0), 1).unwrap(), Some(2));
        assert_eq!(last_index_of(&heap, arr, Value::Number(1.0)).unwrap(), Some(2));
        // NaN is never strictly equal to itself.
        assert_eq!(index_of(&heap, arr, Value::Number(f64::NAN), 0).unwrap(), None);
    }
}
