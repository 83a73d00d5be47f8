//! Heap string payload and string operations
//!
//! Strings are immutable byte buffers on the managed heap. Interned
//! strings additionally live in the runtime's intern table (see
//! [`Heap::intern`](crate::gc::Heap::intern)); everything else is a
//! plain allocation.

use std::cmp::Ordering;

use crate::error::JsError;
use crate::gc::{GcRef, Heap, RootProvider};
use crate::value::Value;

/// String payload stored behind a [`GcRef`].
#[derive(Debug)]
pub struct JsString {
    text: String,
    interned: bool,
}

impl JsString {
    pub fn new(text: String) -> Self {
        Self {
            text,
            interned: false,
        }
    }

    pub(crate) fn new_interned(text: String) -> Self {
        Self {
            text,
            interned: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_interned(&self) -> bool {
        self.interned
    }
}

/// Byte-wise comparison of two heap strings.
pub fn compare(heap: &Heap, a: GcRef, b: GcRef) -> Result<Ordering, JsError> {
    let sa = heap.string(a)?;
    let sb = heap.string(b)?;
    Ok(sa.as_str().as_bytes().cmp(sb.as_str().as_bytes()))
}

/// Concatenation, producing a new heap string.
pub fn concat(heap: &mut Heap, a: GcRef, b: GcRef, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
    let mut text = heap.string(a)?.as_str().to_string();
    text.push_str(heap.string(b)?.as_str());
    heap.push_root(Value::String(a));
    heap.push_root(Value::String(b));
    let result = heap.alloc_string(text, roots);
    heap.pop_roots(2);
    result
}

/// Substring by byte offset and length, clamped to the source.
pub fn substring(
    heap: &mut Heap,
    s: GcRef,
    start: usize,
    length: usize,
    roots: &dyn RootProvider,
) -> Result<GcRef, JsError> {
    let text = {
        let src = heap.string(s)?.as_str();
        let start = start.min(src.len());
        let end = start.saturating_add(length).min(src.len());
        src[start..end].to_string()
    };
    heap.alloc_string(text, roots)
}

pub fn to_lower(heap: &mut Heap, s: GcRef, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
    let text = heap.string(s)?.as_str().to_lowercase();
    heap.alloc_string(text, roots)
}

pub fn to_upper(heap: &mut Heap, s: GcRef, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
    let text = heap.string(s)?.as_str().to_uppercase();
    heap.alloc_string(text, roots)
}

pub fn trim(heap: &mut Heap, s: GcRef, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
    let text = heap.string(s)?.as_str().trim().to_string();
    heap.alloc_string(text, roots)
}

/// Byte offset of the first occurrence of `needle` at or after
/// `from`, or `None`.
pub fn index_of(heap: &Heap, s: GcRef, needle: GcRef, from: usize) -> Result<Option<usize>, JsError> {
    let src = heap.string(s)?.as_str();
    let pat = heap.string(needle)?.as_str();
    if from > src.len() {
        return Ok(None);
    }
    Ok(src[from..].find(pat).map(|i| i + from))
}

/// Splits `s` around `separator` into a new array of heap strings. An
/// empty separator yields one element per character.
pub fn split(
    heap: &mut Heap,
    s: GcRef,
    separator: GcRef,
    roots: &dyn RootProvider,
) -> Result<GcRef, JsError> {
    let parts: Vec<String> = {
        let src = heap.string(s)?.as_str();
        let sep = heap.string(separator)?.as_str();
        if sep.is_empty() {
            src.chars().map(|c| c.to_string()).collect()
        } else {
            src.split(sep).map(|p| p.to_string()).collect()
        }
    };

    let arr = heap.alloc_array(parts.len(), roots)?;
    heap.push_root(Value::Array(arr));
    let mut result = Ok(arr);
    for part in parts {
        match heap.alloc_string(part, roots) {
            Ok(piece) => match heap.array_mut(arr) {
                Ok(a) => a.push(Value::String(piece)),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            },
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    heap.pop_roots(1);
    result
}

/// JSON-style escaping: control characters, quotes and backslashes are
/// rewritten to escape sequences.
pub fn escape(heap: &mut Heap, s: GcRef, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
    let text = {
        let src = heap.string(s)?.as_str();
        let mut out = String::with_capacity(src.len() + 2);
        for c in src.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{8}' => out.push_str("\\b"),
                '\u{c}' => out.push_str("\\f"),
                c if (c as u32) < 0x20 => {
                    out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => out.push(c),
            }
        }
        out
    };
    heap.alloc_string(text, roots)
}
