//! Interactive shell and file runner
//!
//! With no argument, reads statements from standard input and prints
//! each non-undefined result. With one argument, executes the file and
//! prints a completion notice; evaluation failure exits non-zero.

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use jsrun::{Context, Runtime, Value};

const PROMPT: &str = "jsrun> ";

fn main() {
    let args: Vec<String> = env::args().collect();
    let runtime = Runtime::new();
    let mut ctx = match runtime.new_context() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match args.get(1) {
        Some(path) => run_file(&mut ctx, path),
        None => repl(&runtime, &mut ctx),
    }
}

fn run_file(ctx: &mut Context, path: &str) {
    match ctx.eval_file(path) {
        Ok(_) => println!("Executed {}", path),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn print_welcome() {
    println!("jsrun interactive shell");
    println!("Version {}", jsrun::version());
    println!("Type 'exit' or 'quit' to exit, 'help' for help\n");
}

fn print_help() {
    println!("Shell commands:");
    println!("  help          - Show this help message");
    println!("  exit, quit    - Exit the shell");
    println!("  clear         - Clear the screen");
    println!("  .gc           - Force garbage collection");
    println!("  .stats        - Show runtime statistics");
    println!("\nStatements and expressions are executed directly.\n");
}

fn repl(runtime: &Runtime, ctx: &mut Context) {
    print_welcome();
    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "help" => {
                print_help();
                continue;
            }
            "exit" | "quit" => {
                println!("Goodbye!");
                return;
            }
            "clear" => {
                print!("\x1b[2J\x1b[H");
                let _ = io::stdout().flush();
                continue;
            }
            ".gc" => {
                ctx.gc();
                println!("Garbage collection completed");
                continue;
            }
            ".stats" => {
                let stats = runtime.gc_stats();
                println!("Runtime statistics:");
                println!("  Memory usage: {} bytes", runtime.memory_usage());
                println!("  Live objects: {}", stats.live_objects);
                println!("  Collections:  {}", stats.collections);
                println!("  Allocated:    {} bytes", stats.bytes_allocated);
                println!("  Freed:        {} bytes", stats.bytes_freed);
                continue;
            }
            _ => {}
        }

        match ctx.eval(input, "<repl>") {
            Ok(value) => {
                if !value.is_undefined() {
                    print_value(ctx, value);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}

fn print_value(ctx: &Context, value: Value) {
    match value {
        Value::Function(_) => println!("[Function]"),
        Value::Object(_) | Value::Array(_) => {
            let mut visited = Vec::new();
            match value_to_json(ctx, value, &mut visited) {
                Some(json) => println!(
                    "{}",
                    serde_json::to_string_pretty(&json)
                        .unwrap_or_else(|_| ctx.to_display_string(value))
                ),
                None => println!("{}", ctx.to_display_string(value)),
            }
        }
        _ => println!("{}", ctx.to_display_string(value)),
    }
}

/// Best-effort JSON view of a value for pretty printing. Cyclic or
/// unconvertible values yield `None`.
fn value_to_json(ctx: &Context, value: Value, visited: &mut Vec<Value>) -> Option<serde_json::Value> {
    match value {
        Value::Undefined | Value::Null => Some(serde_json::Value::Null),
        Value::Boolean(b) => Some(serde_json::Value::Bool(b)),
        Value::Number(n) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .or(Some(serde_json::Value::Null)),
        Value::String(_) => Some(serde_json::Value::String(ctx.to_display_string(value))),
        Value::Array(_) => {
            if visited.contains(&value) {
                return None;
            }
            visited.push(value);
            let length = ctx.array_length(value).ok()?;
            let mut out = Vec::with_capacity(length);
            for i in 0..length {
                let element = ctx.array_get(value, i).ok()?;
                out.push(value_to_json(ctx, element, visited)?);
            }
            visited.pop();
            Some(serde_json::Value::Array(out))
        }
        Value::Object(_) => {
            if visited.contains(&value) {
                return None;
            }
            visited.push(value);
            let mut map = serde_json::Map::new();
            for name in ctx.property_names(value).ok()? {
                let prop = ctx.get_property(value, &name).ok()?;
                if prop.is_function() {
                    continue;
                }
                map.insert(name, value_to_json(ctx, prop, visited)?);
            }
            visited.pop();
            Some(serde_json::Value::Object(map))
        }
        _ => None,
    }
}
