//! Lexer benchmarks
//!
//! Run with: cargo bench --bench lexer

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use jsrun::lexer::Lexer;

const SIMPLE_EXPR: &str = "1 + 2 * 3 - 4 / 5";

const VARIABLES: &str = r#"
var x = 1;
let y = 2;
const z = 3;
var a = x + y + z;
var b = a * 2;
"#;

const MIXED: &str = r#"
function fib(n) {
    if (n < 2) { return n; }
    return fib(n - 1) + fib(n - 2);
}
var numbers = [1, 2, 3, 4, 5];
var config = { name: "bench", deep: { flag: true } };
var i = 0;
while (i < 10) { i += 1; }
"#;

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    for (name, source) in [
        ("simple_expr", SIMPLE_EXPR),
        ("variables", VARIABLES),
        ("mixed", MIXED),
    ] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| Lexer::new(black_box(source)).tokenize().unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
