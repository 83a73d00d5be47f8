//! Tests for the virtual machine on hand-built bytecode

use std::rc::Rc;

use jsrun::compiler::builder::ChunkBuilder;
use jsrun::compiler::bytecode::{Chunk, Op};
use jsrun::{Context, ErrorCode, Runtime, Value};

fn context() -> (Runtime, Context) {
    let runtime = Runtime::new();
    let ctx = runtime.new_context().unwrap();
    (runtime, ctx)
}

fn run(ctx: &mut Context, chunk: Chunk) -> Value {
    ctx.execute(Rc::new(chunk)).unwrap()
}

#[test]
fn test_conditional_jump_program() {
    // LOAD_CONST true; JUMP_IF_TRUE 4; LOAD_CONST 0; JUMP 5;
    // LOAD_CONST 42; RETURN  => 42
    let (_runtime, mut ctx) = context();
    let mut b = ChunkBuilder::new(None);
    let t = b.add_constant(Value::Boolean(true)).unwrap();
    let zero = b.add_number(0.0).unwrap();
    let answer = b.add_number(42.0).unwrap();
    b.emit(Op::LoadConst, t);
    b.emit(Op::JumpIfTrue, 4);
    b.emit(Op::LoadConst, zero);
    b.emit(Op::Jump, 5);
    b.emit(Op::LoadConst, answer);
    b.emit_op(Op::Return);

    assert_eq!(run(&mut ctx, b.finish()), Value::Number(42.0));
}

#[test]
fn test_arithmetic_semantics() {
    let (_runtime, mut ctx) = context();

    let cases: &[(f64, Op, f64, f64)] = &[
        (6.0, Op::Add, 4.0, 10.0),
        (6.0, Op::Sub, 4.0, 2.0),
        (6.0, Op::Mul, 4.0, 24.0),
        (6.0, Op::Div, 4.0, 1.5),
        (7.0, Op::Mod, 4.0, 3.0),
    ];
    for &(a, op, b, expected) in cases {
        let mut builder = ChunkBuilder::new(None);
        let ca = builder.add_number(a).unwrap();
        let cb = builder.add_number(b).unwrap();
        builder.emit(Op::LoadConst, ca);
        builder.emit(Op::LoadConst, cb);
        builder.emit_op(op);
        builder.emit_op(Op::Halt);
        assert_eq!(run(&mut ctx, builder.finish()), Value::Number(expected));
    }
}

#[test]
fn test_division_by_zero() {
    let (_runtime, mut ctx) = context();

    let cases: &[(f64, f64)] = &[(1.0, f64::INFINITY), (-1.0, f64::NEG_INFINITY), (0.0, f64::INFINITY)];
    for &(numerator, expected) in cases {
        let mut b = ChunkBuilder::new(None);
        let n = b.add_number(numerator).unwrap();
        let z = b.add_number(0.0).unwrap();
        b.emit(Op::LoadConst, n);
        b.emit(Op::LoadConst, z);
        b.emit_op(Op::Div);
        b.emit_op(Op::Halt);
        assert_eq!(run(&mut ctx, b.finish()), Value::Number(expected));
    }

    // Modulo by zero is NaN.
    let mut b = ChunkBuilder::new(None);
    let n = b.add_number(5.0).unwrap();
    let z = b.add_number(0.0).unwrap();
    b.emit(Op::LoadConst, n);
    b.emit(Op::LoadConst, z);
    b.emit_op(Op::Mod);
    b.emit_op(Op::Halt);
    let result = run(&mut ctx, b.finish());
    assert!(matches!(result, Value::Number(n) if n.is_nan()));
}

#[test]
fn test_add_concatenates_strings() {
    let (_runtime, mut ctx) = context();

    // "5" + 1 => "51"
    let five = ctx.intern_string("5").unwrap();
    let mut b = ChunkBuilder::new(None);
    let s = b.add_constant(five).unwrap();
    let one = b.add_number(1.0).unwrap();
    b.emit(Op::LoadConst, s);
    b.emit(Op::LoadConst, one);
    b.emit_op(Op::Add);
    b.emit_op(Op::Halt);
    let result = run(&mut ctx, b.finish());
    assert_eq!(ctx.to_display_string(result), "51");
    assert!(result.is_string());
}

#[test]
fn test_strict_equality_rules() {
    let (_runtime, mut ctx) = context();

    // 1 == "1" is false under strict tag equality.
    let one_str = ctx.intern_string("1").unwrap();
    let mut b = ChunkBuilder::new(None);
    let n = b.add_number(1.0).unwrap();
    let s = b.add_constant(one_str).unwrap();
    b.emit(Op::LoadConst, n);
    b.emit(Op::LoadConst, s);
    b.emit_op(Op::Eq);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Boolean(false));

    // NaN != NaN.
    let mut b = ChunkBuilder::new(None);
    let nan = b.add_constant(Value::Number(f64::NAN)).unwrap();
    b.emit(Op::LoadConst, nan);
    b.emit(Op::LoadConst, nan);
    b.emit_op(Op::Eq);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Boolean(false));
}

#[test]
fn test_bitwise_and_shift_masking() {
    let (_runtime, mut ctx) = context();

    // 1 << 33 masks the count to 1.
    let mut b = ChunkBuilder::new(None);
    let one = b.add_number(1.0).unwrap();
    let count = b.add_number(33.0).unwrap();
    b.emit(Op::LoadConst, one);
    b.emit(Op::LoadConst, count);
    b.emit_op(Op::Shl);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Number(2.0));

    let mut b = ChunkBuilder::new(None);
    let a = b.add_number(6.0).unwrap();
    let c = b.add_number(3.0).unwrap();
    b.emit(Op::LoadConst, a);
    b.emit(Op::LoadConst, c);
    b.emit_op(Op::BitAnd);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Number(2.0));
}

#[test]
fn test_stack_ops() {
    let (_runtime, mut ctx) = context();

    // 1 2 SWAP SUB => 2 - 1 = 1
    let mut b = ChunkBuilder::new(None);
    let one = b.add_number(1.0).unwrap();
    let two = b.add_number(2.0).unwrap();
    b.emit(Op::LoadConst, one);
    b.emit(Op::LoadConst, two);
    b.emit_op(Op::Swap);
    b.emit_op(Op::Sub);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Number(1.0));

    // DUP MUL squares.
    let mut b = ChunkBuilder::new(None);
    let three = b.add_number(3.0).unwrap();
    b.emit(Op::LoadConst, three);
    b.emit_op(Op::Dup);
    b.emit_op(Op::Mul);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Number(9.0));
}

#[test]
fn test_typeof_strings() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    b.emit_op(Op::PushNull);
    b.emit_op(Op::Typeof);
    b.emit_op(Op::Halt);
    let result = run(&mut ctx, b.finish());
    // The JavaScript quirk.
    assert_eq!(ctx.to_display_string(result), "object");

    let mut b = ChunkBuilder::new(None);
    b.emit_op(Op::PushUndefined);
    b.emit_op(Op::Typeof);
    b.emit_op(Op::Halt);
    let result = run(&mut ctx, b.finish());
    assert_eq!(ctx.to_display_string(result), "undefined");
}

#[test]
fn test_array_opcodes() {
    let (_runtime, mut ctx) = context();

    // [10, 20] -> pop -> 20
    let mut b = ChunkBuilder::new(None);
    let ten = b.add_number(10.0).unwrap();
    let twenty = b.add_number(20.0).unwrap();
    b.emit(Op::NewArray, 2);
    b.emit(Op::LoadConst, ten);
    b.emit_op(Op::ArrayPush);
    b.emit(Op::LoadConst, twenty);
    b.emit_op(Op::ArrayPush);
    b.emit_op(Op::ArrayPop);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Number(20.0));

    // Reads on a non-array receiver push undefined.
    let mut b = ChunkBuilder::new(None);
    let zero = b.add_number(0.0).unwrap();
    b.emit_op(Op::PushNull);
    b.emit(Op::LoadConst, zero);
    b.emit_op(Op::ArrayGet);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Undefined);
}

#[test]
fn test_array_write_on_non_array_faults() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    let zero = b.add_number(0.0).unwrap();
    b.emit_op(Op::PushNull);
    b.emit(Op::LoadConst, zero);
    b.emit(Op::LoadConst, zero);
    b.emit_op(Op::ArraySet);
    b.emit_op(Op::Halt);
    assert!(ctx.execute(Rc::new(b.finish())).is_err());
    assert_ne!(ctx.error_code(), ErrorCode::Ok);
}

#[test]
fn test_out_of_range_pool_index_is_runtime_error() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    b.emit(Op::LoadConst, 7);
    b.emit_op(Op::Halt);
    let err = ctx.execute(Rc::new(b.finish())).unwrap_err();
    assert_eq!(err.code(), ErrorCode::RuntimeError);
}

#[test]
fn test_out_of_range_jump_is_runtime_error() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    b.emit(Op::Jump, 99);
    b.emit_op(Op::Halt);
    assert!(ctx.execute(Rc::new(b.finish())).is_err());
}

#[test]
fn test_vm_recovers_after_error() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    b.emit(Op::LoadConst, 7);
    b.emit_op(Op::Halt);
    assert!(ctx.execute(Rc::new(b.finish())).is_err());

    // A later, valid execution succeeds.
    assert_eq!(ctx.eval("1 + 1", "<test>").unwrap(), Value::Number(2.0));
}

#[test]
fn test_store_and_load_globals() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    let name = ctx.intern_string("answer").unwrap();
    let Value::String(name_ref) = name else {
        panic!("intern_string did not return a string");
    };
    let idx = b.add_string("answer", name_ref).unwrap();
    let forty_two = b.add_number(42.0).unwrap();
    b.emit(Op::LoadConst, forty_two);
    b.emit(Op::StoreVar, idx);
    b.emit(Op::LoadVar, idx);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Number(42.0));

    // Visible through the embedding API too.
    assert_eq!(ctx.get_global("answer").unwrap(), Value::Number(42.0));
}

#[test]
fn test_undefined_variable_loads_undefined() {
    let (_runtime, mut ctx) = context();

    let name = ctx.intern_string("missing").unwrap();
    let Value::String(name_ref) = name else {
        panic!("intern_string did not return a string");
    };
    let mut b = ChunkBuilder::new(None);
    let idx = b.add_string("missing", name_ref).unwrap();
    b.emit(Op::LoadVar, idx);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Undefined);
}

#[test]
fn test_logical_ops_produce_booleans() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    let n = b.add_number(7.0).unwrap();
    b.emit(Op::LoadConst, n);
    b.emit_op(Op::PushTrue);
    b.emit_op(Op::And);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Boolean(true));

    let mut b = ChunkBuilder::new(None);
    b.emit_op(Op::PushFalse);
    b.emit_op(Op::Not);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Boolean(true));
}

#[test]
fn test_halt_returns_top_of_stack() {
    let (_runtime, mut ctx) = context();

    let mut b = ChunkBuilder::new(None);
    let n = b.add_number(5.0).unwrap();
    b.emit(Op::LoadConst, n);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Number(5.0));

    // Empty stack at halt yields undefined.
    let mut b = ChunkBuilder::new(None);
    b.emit_op(Op::Halt);
    assert_eq!(run(&mut ctx, b.finish()), Value::Undefined);
}
