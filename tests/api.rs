//! Tests for the embedding API

use jsrun::{Context, ErrorCode, JsError, PropertyDescriptor, Runtime, Value};

#[test]
fn test_runtime_and_context_lifecycle() {
    let runtime = Runtime::new();
    let ctx_a = runtime.new_context().unwrap();
    let ctx_b = runtime.new_context().unwrap();
    // Contexts have distinct global objects on the shared heap.
    assert_ne!(ctx_a.global_object(), ctx_b.global_object());
    drop(ctx_a);
    drop(ctx_b);
    // Dropping contexts unpins their globals.
    runtime.collect();
}

#[test]
fn test_value_constructors_and_predicates() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    assert!(Value::Undefined.is_undefined());
    assert!(Value::Null.is_null());
    assert!(Value::Boolean(true).is_boolean());
    assert!(Value::Number(1.5).is_number());

    let s = ctx.new_string("hello").unwrap();
    assert!(s.is_string());
    assert_eq!(ctx.to_display_string(s), "hello");

    let o = ctx.new_object().unwrap();
    assert!(o.is_object());
    let a = ctx.new_array().unwrap();
    assert!(a.is_array());
}

#[test]
fn test_coercions() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    assert!(!ctx.to_boolean(Value::Undefined));
    assert!(!ctx.to_boolean(Value::Null));
    assert!(!ctx.to_boolean(Value::Number(0.0)));
    assert!(!ctx.to_boolean(Value::Number(f64::NAN)));
    assert!(ctx.to_boolean(Value::Number(2.0)));

    let empty = ctx.new_string("").unwrap();
    let full = ctx.new_string("x").unwrap();
    assert!(!ctx.to_boolean(empty));
    assert!(ctx.to_boolean(full));

    assert!(ctx.to_number(Value::Undefined).is_nan());
    assert_eq!(ctx.to_number(Value::Null), 0.0);
    assert_eq!(ctx.to_number(Value::Boolean(true)), 1.0);

    let numeric = ctx.new_string(" 42 ").unwrap();
    assert_eq!(ctx.to_number(numeric), 42.0);
    let inf = ctx.new_string("Infinity").unwrap();
    assert_eq!(ctx.to_number(inf), f64::INFINITY);
    let junk = ctx.new_string("12abc").unwrap();
    assert!(ctx.to_number(junk).is_nan());

    assert_eq!(ctx.to_display_string(Value::Undefined), "undefined");
    assert_eq!(ctx.to_display_string(Value::Null), "null");
    assert_eq!(ctx.to_display_string(Value::Boolean(false)), "false");
    assert_eq!(ctx.to_display_string(Value::Number(14.0)), "14");
    let obj = ctx.new_object().unwrap();
    assert_eq!(ctx.to_display_string(obj), "[object Object]");
    let arr = ctx.new_array().unwrap();
    assert_eq!(ctx.to_display_string(arr), "[object Array]");
}

#[test]
fn test_object_property_api() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let obj = ctx.new_object().unwrap();
    ctx.set_property(obj, "name", Value::Number(1.0)).unwrap();
    assert_eq!(ctx.get_property(obj, "name").unwrap(), Value::Number(1.0));
    assert!(ctx.has_property(obj, "name").unwrap());
    assert!(!ctx.has_property(obj, "other").unwrap());
    assert_eq!(ctx.get_property(obj, "other").unwrap(), Value::Undefined);

    assert!(ctx.delete_property(obj, "name").unwrap());
    assert!(!ctx.has_property(obj, "name").unwrap());

    // Non-configurable properties refuse deletion.
    ctx.define_property(
        obj,
        "pinned",
        PropertyDescriptor {
            value: Value::Number(2.0),
            writable: true,
            enumerable: true,
            configurable: false,
        },
    )
    .unwrap();
    assert!(!ctx.delete_property(obj, "pinned").unwrap());

    // Property access on non-objects is a type error at the API level.
    assert!(ctx.get_property(Value::Null, "x").is_err());
    assert!(ctx.set_property(Value::Number(1.0), "x", Value::Null).is_err());
}

#[test]
fn test_array_api() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let arr = ctx.new_array().unwrap();
    assert_eq!(ctx.array_length(arr).unwrap(), 0);

    ctx.array_push(arr, Value::Number(1.0)).unwrap();
    ctx.array_push(arr, Value::Number(2.0)).unwrap();
    assert_eq!(ctx.array_length(arr).unwrap(), 2);
    assert_eq!(ctx.array_get(arr, 0).unwrap(), Value::Number(1.0));

    // Writing past the end fills holes with undefined.
    ctx.array_set(arr, 4, Value::Number(5.0)).unwrap();
    assert_eq!(ctx.array_length(arr).unwrap(), 5);
    assert_eq!(ctx.array_get(arr, 3).unwrap(), Value::Undefined);

    assert_eq!(ctx.array_pop(arr).unwrap(), Value::Number(5.0));
    assert_eq!(ctx.array_length(arr).unwrap(), 4);

    // Push then pop leaves the remaining elements unchanged.
    ctx.array_push(arr, Value::Number(9.0)).unwrap();
    ctx.array_pop(arr).unwrap();
    assert_eq!(ctx.array_get(arr, 0).unwrap(), Value::Number(1.0));
    assert_eq!(ctx.array_get(arr, 1).unwrap(), Value::Number(2.0));
    assert_eq!(ctx.array_length(arr).unwrap(), 4);
}

fn native_add(ctx: &mut Context, args: &[Value]) -> Result<Value, JsError> {
    let mut sum = 0.0;
    for arg in args {
        sum += ctx.to_number(*arg);
    }
    Ok(Value::Number(sum))
}

fn native_greet(ctx: &mut Context, args: &[Value]) -> Result<Value, JsError> {
    let who = args
        .first()
        .map(|v| ctx.to_display_string(*v))
        .unwrap_or_else(|| "world".to_string());
    ctx.new_string(&format!("hello {}", who))
}

fn native_fail(_ctx: &mut Context, _args: &[Value]) -> Result<Value, JsError> {
    Err(JsError::runtime_error("native failure"))
}

#[test]
fn test_native_function_on_global() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    ctx.define_global_function("add", native_add).unwrap();
    assert_eq!(
        ctx.eval("add(1, 2, 3)", "<test>").unwrap(),
        Value::Number(6.0)
    );
    // Natives mix with script expressions.
    assert_eq!(
        ctx.eval("add(1, 2) * add(2, 3)", "<test>").unwrap(),
        Value::Number(15.0)
    );
}

#[test]
fn test_native_function_on_object() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let host = ctx.new_object().unwrap();
    ctx.define_function(host, "greet", native_greet).unwrap();
    ctx.set_global("host", host).unwrap();

    let result = ctx.eval("host.greet('embedder')", "<test>").unwrap();
    assert_eq!(ctx.to_display_string(result), "hello embedder");
}

#[test]
fn test_native_error_propagates() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    ctx.define_global_function("fail", native_fail).unwrap();
    let err = ctx.eval("fail()", "<test>").unwrap_err();
    assert_eq!(err.code(), ErrorCode::RuntimeError);
    assert_eq!(ctx.error_code(), ErrorCode::RuntimeError);
}

#[test]
fn test_host_call_into_script_function() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    ctx.eval("function double(x) { return x * 2; }", "<test>")
        .unwrap();
    let f = ctx.get_global("double").unwrap();
    assert!(f.is_function());

    let result = ctx
        .call_function(f, Value::Undefined, &[Value::Number(21.0)])
        .unwrap();
    assert_eq!(result, Value::Number(42.0));

    // Calling a non-function reports a type error.
    let err = ctx
        .call_function(Value::Number(1.0), Value::Undefined, &[])
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeError);
}

#[test]
fn test_globals_round_trip() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    ctx.set_global("fromHost", Value::Number(99.0)).unwrap();
    assert_eq!(
        ctx.eval("fromHost + 1", "<test>").unwrap(),
        Value::Number(100.0)
    );

    ctx.eval("var fromScript = 'marker';", "<test>").unwrap();
    let value = ctx.get_global("fromScript").unwrap();
    assert_eq!(ctx.to_display_string(value), "marker");
}

#[test]
fn test_property_names_enumeration() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let obj = ctx.eval("var o = {x: 1, y: 2, z: 3}; o", "<test>").unwrap();
    assert_eq!(ctx.property_names(obj).unwrap(), vec!["x", "y", "z"]);
}

#[test]
fn test_memory_observability() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    assert!(ctx.memory_usage() > 0);
    ctx.eval("var a = [1, 2, 3, 4];", "<test>").unwrap();
    let with_garbage = {
        ctx.eval("var t = 0; var i = 0; while (i < 100) { t = {n: i}; i = i + 1; }", "<test>")
            .unwrap();
        ctx.memory_usage()
    };
    ctx.gc();
    assert!(ctx.memory_usage() <= with_garbage);
    assert!(runtime.gc_stats().collections >= 1);
}

#[test]
fn test_string_operations() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let hello = ctx.new_string("Hello").unwrap();
    let world = ctx.new_string(" World").unwrap();
    let both = ctx.string_concat(hello, world).unwrap();
    assert_eq!(ctx.to_display_string(both), "Hello World");
    assert_eq!(ctx.string_length(both).unwrap(), 11);

    let upper = ctx.string_to_upper(both).unwrap();
    assert_eq!(ctx.to_display_string(upper), "HELLO WORLD");
    let lower = ctx.string_to_lower(both).unwrap();
    assert_eq!(ctx.to_display_string(lower), "hello world");

    let padded = ctx.new_string("  x  ").unwrap();
    let trimmed = ctx.string_trim(padded).unwrap();
    assert_eq!(ctx.to_display_string(trimmed), "x");

    let sub = ctx.string_substring(both, 6, 5).unwrap();
    assert_eq!(ctx.to_display_string(sub), "World");

    let needle = ctx.new_string("World").unwrap();
    assert_eq!(ctx.string_index_of(both, needle, 0).unwrap(), Some(6));
    assert_eq!(ctx.string_index_of(both, needle, 7).unwrap(), None);

    assert_eq!(
        ctx.string_compare(hello, needle).unwrap(),
        std::cmp::Ordering::Less
    );

    let csv = ctx.new_string("a,b,c").unwrap();
    let comma = ctx.new_string(",").unwrap();
    let parts = ctx.string_split(csv, comma).unwrap();
    assert_eq!(ctx.array_length(parts).unwrap(), 3);
    assert_eq!(
        ctx.to_display_string(ctx.array_get(parts, 1).unwrap()),
        "b"
    );

    let raw = ctx.new_string("line\n\"quoted\"").unwrap();
    let escaped = ctx.string_escape(raw).unwrap();
    assert_eq!(ctx.to_display_string(escaped), "line\\n\\\"quoted\\\"");
}

#[test]
fn test_array_operations() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let arr = ctx.new_array().unwrap();
    for i in 0..5 {
        ctx.array_push(arr, Value::Number(i as f64)).unwrap();
    }

    assert_eq!(
        ctx.array_index_of(arr, Value::Number(3.0), 0).unwrap(),
        Some(3)
    );
    assert_eq!(
        ctx.array_last_index_of(arr, Value::Number(3.0)).unwrap(),
        Some(3)
    );
    assert!(ctx.array_includes(arr, Value::Number(0.0)).unwrap());
    assert!(!ctx.array_includes(arr, Value::Number(9.0)).unwrap());

    let tail = ctx.array_slice(arr, -2, 5).unwrap();
    assert_eq!(ctx.array_length(tail).unwrap(), 2);
    assert_eq!(ctx.array_get(tail, 0).unwrap(), Value::Number(3.0));

    let removed = ctx
        .array_splice(arr, 1, 2, &[Value::Number(9.0)])
        .unwrap();
    assert_eq!(ctx.array_length(removed).unwrap(), 2);
    assert_eq!(ctx.array_length(arr).unwrap(), 4);
    assert_eq!(ctx.array_get(arr, 1).unwrap(), Value::Number(9.0));

    ctx.array_unshift(arr, Value::Number(-1.0)).unwrap();
    assert_eq!(ctx.array_get(arr, 0).unwrap(), Value::Number(-1.0));
    assert_eq!(ctx.array_shift(arr).unwrap(), Value::Number(-1.0));

    ctx.array_reverse(arr).unwrap();
    assert_eq!(ctx.array_get(arr, 0).unwrap(), Value::Number(4.0));

    let joined = ctx.array_join(arr, "-").unwrap();
    assert_eq!(joined, "4-3-9-0");

    let other = ctx.new_array().unwrap();
    ctx.array_push(other, Value::Number(7.0)).unwrap();
    let combined = ctx.array_concat(arr, other).unwrap();
    assert_eq!(ctx.array_length(combined).unwrap(), 5);

    ctx.array_set_length(combined, 2).unwrap();
    assert_eq!(ctx.array_length(combined).unwrap(), 2);
}

#[test]
fn test_seal_freeze_and_clone() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let obj = ctx.new_object().unwrap();
    ctx.set_property(obj, "a", Value::Number(1.0)).unwrap();
    assert!(ctx.is_extensible(obj).unwrap());

    let copy = ctx.clone_object(obj).unwrap();
    assert_eq!(ctx.get_property(copy, "a").unwrap(), Value::Number(1.0));

    ctx.seal(obj).unwrap();
    assert!(ctx.is_sealed(obj).unwrap());
    assert!(!ctx.is_frozen(obj).unwrap());
    // Sealed objects still accept writes to existing properties.
    ctx.set_property(obj, "a", Value::Number(2.0)).unwrap();
    assert_eq!(ctx.get_property(obj, "a").unwrap(), Value::Number(2.0));

    ctx.freeze(obj).unwrap();
    assert!(ctx.is_frozen(obj).unwrap());
    // Frozen writes are silently rejected.
    ctx.set_property(obj, "a", Value::Number(3.0)).unwrap();
    assert_eq!(ctx.get_property(obj, "a").unwrap(), Value::Number(2.0));

    // The clone is unaffected by freezing the original.
    ctx.set_property(copy, "a", Value::Number(5.0)).unwrap();
    assert_eq!(ctx.get_property(copy, "a").unwrap(), Value::Number(5.0));
}

#[test]
fn test_prototype_slot() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();

    let obj = ctx.new_object().unwrap();
    assert_eq!(ctx.get_prototype(obj).unwrap(), Value::Null);

    let proto = ctx.new_object().unwrap();
    ctx.set_prototype(obj, proto).unwrap();
    assert_eq!(ctx.get_prototype(obj).unwrap(), proto);

    // The prototype slot is recorded but not consulted by lookup.
    ctx.set_property(proto, "inherited", Value::Number(1.0))
        .unwrap();
    assert_eq!(
        ctx.get_property(obj, "inherited").unwrap(),
        Value::Undefined
    );

    ctx.set_prototype(obj, Value::Null).unwrap();
    assert_eq!(ctx.get_prototype(obj).unwrap(), Value::Null);
}

#[test]
fn test_typeof_api() {
    let runtime = Runtime::new();
    let mut ctx = runtime.new_context().unwrap();
    assert_eq!(ctx.type_of(Value::Null), "object");
    assert_eq!(ctx.type_of(Value::Number(1.0)), "number");
    let f = {
        ctx.eval("function f() {}", "<test>").unwrap();
        ctx.get_global("f").unwrap()
    };
    assert_eq!(ctx.type_of(f), "function");
}
