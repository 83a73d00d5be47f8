//! Objects and property lists
//!
//! Properties are kept in a flat list in insertion order; lookup is a
//! linear byte-wise key match. Extensibility transitions are one-way.

use crate::error::JsError;
use crate::gc::{GcRef, Heap, RootProvider};
use crate::value::Value;

/// One named slot on an object. The key is always an interned heap
/// string.
#[derive(Debug, Clone, Copy)]
pub struct Property {
    pub key: GcRef,
    pub value: Value,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

/// Attribute set used by [`define_property`].
#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub value: Value,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Default for PropertyDescriptor {
    fn default() -> Self {
        Self {
            value: Value::Undefined,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }
}

/// Object payload stored behind a [`GcRef`].
#[derive(Debug, Default)]
pub struct JsObject {
    pub properties: Vec<Property>,
    pub prototype: Option<GcRef>,
    pub extensible: bool,
}

impl JsObject {
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            prototype: None,
            extensible: true,
        }
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// One-way transition: once non-extensible, always non-extensible.
    pub fn prevent_extensions(&mut self) {
        self.extensible = false;
    }

    /// Seals the object: no new properties, none removable.
    pub fn seal(&mut self) {
        self.extensible = false;
        for prop in &mut self.properties {
            prop.configurable = false;
        }
    }

    /// Freezes the object: sealed plus read-only properties.
    pub fn freeze(&mut self) {
        self.seal();
        for prop in &mut self.properties {
            prop.writable = false;
        }
    }

    pub fn is_sealed(&self) -> bool {
        !self.extensible && self.properties.iter().all(|p| !p.configurable)
    }

    pub fn is_frozen(&self) -> bool {
        self.is_sealed() && self.properties.iter().all(|p| !p.writable)
    }
}

fn find_index(heap: &Heap, obj: GcRef, key: &str) -> Result<Option<usize>, JsError> {
    let object = heap.object(obj)?;
    for (i, prop) in object.properties.iter().enumerate() {
        if heap.string(prop.key)?.as_str() == key {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Reads an own property. Does not walk the prototype chain.
pub fn get_property(heap: &Heap, obj: GcRef, key: &str) -> Result<Option<Value>, JsError> {
    match find_index(heap, obj, key)? {
        Some(i) => Ok(Some(heap.object(obj)?.properties[i].value)),
        None => Ok(None),
    }
}

/// Writes a property. Returns `false` if the write was rejected (the
/// property is read-only, or the object is not extensible and the key
/// is new).
pub fn set_property(
    heap: &mut Heap,
    obj: GcRef,
    key: &str,
    value: Value,
    roots: &dyn RootProvider,
) -> Result<bool, JsError> {
    if let Some(i) = find_index(heap, obj, key)? {
        let object = heap.object(obj)?;
        if !object.properties[i].writable {
            return Ok(false);
        }
        heap.object_mut(obj)?.properties[i].value = value;
        return Ok(true);
    }

    if !heap.object(obj)?.extensible {
        return Ok(false);
    }

    // Pin the operands across the key allocation.
    heap.push_root(Value::Object(obj));
    heap.push_root(value);
    let key_ref = heap.intern(key, roots);
    heap.pop_roots(2);
    let key_ref = key_ref?;

    heap.object_mut(obj)?.properties.push(Property {
        key: key_ref,
        value,
        writable: true,
        enumerable: true,
        configurable: true,
    });
    heap.refresh_bytes(obj);
    Ok(true)
}

/// Defines (or redefines) a property with explicit attributes. Returns
/// `false` when rejected: the existing property is non-configurable, or
/// the object is not extensible and the key is new.
pub fn define_property(
    heap: &mut Heap,
    obj: GcRef,
    key: &str,
    desc: PropertyDescriptor,
    roots: &dyn RootProvider,
) -> Result<bool, JsError> {
    if let Some(i) = find_index(heap, obj, key)? {
        if !heap.object(obj)?.properties[i].configurable {
            return Ok(false);
        }
        let prop = &mut heap.object_mut(obj)?.properties[i];
        prop.value = desc.value;
        prop.writable = desc.writable;
        prop.enumerable = desc.enumerable;
        prop.configurable = desc.configurable;
        return Ok(true);
    }

    if !heap.object(obj)?.extensible {
        return Ok(false);
    }

    heap.push_root(Value::Object(obj));
    heap.push_root(desc.value);
    let key_ref = heap.intern(key, roots);
    heap.pop_roots(2);
    let key_ref = key_ref?;

    heap.object_mut(obj)?.properties.push(Property {
        key: key_ref,
        value: desc.value,
        writable: desc.writable,
        enumerable: desc.enumerable,
        configurable: desc.configurable,
    });
    heap.refresh_bytes(obj);
    Ok(true)
}

/// Deletes an own property. Fails (returns `false`) only when the
/// property exists and is non-configurable.
pub fn delete_property(heap: &mut Heap, obj: GcRef, key: &str) -> Result<bool, JsError> {
    match find_index(heap, obj, key)? {
        Some(i) => {
            if !heap.object(obj)?.properties[i].configurable {
                return Ok(false);
            }
            heap.object_mut(obj)?.properties.remove(i);
            heap.refresh_bytes(obj);
            Ok(true)
        }
        None => Ok(true),
    }
}

/// Own-chain existence check; prototype traversal is the caller's
/// choice.
pub fn has_property(heap: &Heap, obj: GcRef, key: &str) -> Result<bool, JsError> {
    Ok(find_index(heap, obj, key)?.is_some())
}

/// Names of the enumerable own properties, in insertion order.
pub fn property_names(heap: &Heap, obj: GcRef) -> Result<Vec<String>, JsError> {
    let object = heap.object(obj)?;
    let mut names = Vec::with_capacity(object.property_count());
    for prop in &object.properties {
        if prop.enumerable {
            names.push(heap.string(prop.key)?.as_str().to_string());
        }
    }
    Ok(names)
}

/// Shallow clone: copies the property list, prototype link and
/// extensibility flag. Property values are shared.
pub fn clone_object(heap: &mut Heap, obj: GcRef, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
    heap.push_root(Value::Object(obj));
    let result = heap.alloc_object(roots);
    heap.pop_roots(1);
    let copy = result?;

    let (properties, prototype, extensible) = {
        let src = heap.object(obj)?;
        (src.properties.clone(), src.prototype, src.extensible)
    };
    let dst = heap.object_mut(copy)?;
    dst.properties = properties;
    dst.prototype = prototype;
    dst.extensible = extensible;
    heap.refresh_bytes(copy);
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::NoRoots;

    #[test]
    fn test_set_get_delete() {
        let mut heap = Heap::new();
        let obj = heap.alloc_object(&NoRoots).unwrap();
        assert!(set_property(&mut heap, obj, "x", Value::Number(1.0), &NoRoots).unwrap());
        assert_eq!(
            get_property(&heap, obj, "x").unwrap(),
            Some(Value::Number(1.0))
        );
        assert!(has_property(&heap, obj, "x").unwrap());
        assert!(delete_property(&mut heap, obj, "x").unwrap());
        assert_eq!(get_property(&heap, obj, "x").unwrap(), None);
        // Deleting a missing property succeeds.
        assert!(delete_property(&mut heap, obj, "x").unwrap());
    }

    #[test]
    fn test_freeze_rejects_writes() {
        let mut heap = Heap::new();
        let obj = heap.alloc_object(&NoRoots).unwrap();
        set_property(&mut heap, obj, "x", Value::Number(1.0), &NoRoots).unwrap();
        heap.object_mut(obj).unwrap().freeze();
        assert!(!set_property(&mut heap, obj, "x", Value::Number(2.0), &NoRoots).unwrap());
        assert!(!set_property(&mut heap, obj, "y", Value::Number(3.0), &NoRoots).unwrap());
        assert!(!delete_property(&mut heap, obj, "x").unwrap());
        assert!(heap.object(obj).unwrap().is_frozen());
        assert!(heap.object(obj).unwrap().is_sealed());
    }

    #[test]
    fn test_property_names_insertion_order() {
        let mut heap = Heap::new();
        let obj = heap.alloc_object(&NoRoots).unwrap();
        set_property(&mut heap, obj, "a", Value::Number(1.0), &NoRoots).unwrap();
        set_property(&mut heap, obj, "b", Value::Number(2.0), &NoRoots).unwrap();
        define_property(
            &mut heap,
            obj,
            "hidden",
            PropertyDescriptor {
                value: Value::Null,
                enumerable: false,
                ..Default::default()
            },
            &NoRoots,
        )
        .unwrap();
        assert_eq!(property_names(&heap, obj).unwrap(), vec!["a", "b"]);
    }
}
