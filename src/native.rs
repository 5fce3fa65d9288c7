//! Built-in fonksiyonlar ve değer-görüntü yardımcıları.
//!
//! Hepsi başlangıçta global ortama const olarak kaydedilir. Kombinatörler
//! (`map`/`filter`/`reduce`) kullanıcı fonksiyonlarını geri çağırabilmek
//! için interpreter'ı alır.

use std::io::{self, BufRead, Write};

use crate::environment::Environment;
use crate::interpreter::Interpreter;
use crate::value::{fmt_number, Value};

pub fn install_builtins(env: &mut Environment) {
    env.define("print", Value::Native(native_print), true);
    env.define("len", Value::Native(native_len), true);
    env.define("range", Value::Native(native_range), true);
    env.define("str", Value::Native(native_str), true);
    env.define("int", Value::Native(native_int), true);
    env.define("float", Value::Native(native_float), true);
    env.define("type", Value::Native(native_type), true);
    env.define("input", Value::Native(native_input), true);
    env.define("map", Value::Native(native_map), true);
    env.define("filter", Value::Native(native_filter), true);
    env.define("reduce", Value::Native(native_reduce), true);
    env.define("sum", Value::Native(native_sum), true);
    env.define("max", Value::Native(native_max), true);
    env.define("min", Value::Native(native_min), true);
    env.define("abs", Value::Native(native_abs), true);
}

pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::Nil => "nil".to_string(),
        Value::Number(n) => fmt_number(*n),
        Value::Str(s) => s.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let inner: Vec<_> = items.borrow().iter().map(display_element).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Map(entries) => {
            let inner: Vec<_> = entries
                .borrow()
                .iter()
                .map(|(k, v)| format!("{}: {}", k, display_element(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        Value::Function(_) => "<function>".to_string(),
        Value::Class(c) => format!("<class {}>", c.name),
        Value::Instance(i) => format!("<{} instance>", i.borrow().class.name),
        Value::Native(_) => "<native function>".to_string(),
    }
}

/// Kapsayıcı içi gösterim: string'ler tırnaklanır.
fn display_element(v: &Value) -> String {
    match v {
        Value::Str(s) => format!("\"{}\"", s),
        other => value_to_string(other),
    }
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    match args.get(i) {
        Some(Value::Number(n)) => *n,
        _ => 0.0,
    }
}

fn native_print(_interp: &mut Interpreter, args: &[Value]) -> Value {
    let parts: Vec<_> = args.iter().map(value_to_string).collect();
    println!("{}", parts.join(" "));
    let _ = io::stdout().flush();
    Value::Nil
}

fn native_len(_interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() != 1 {
        eprintln!("error: len() takes 1 argument");
        return Value::Number(0.0);
    }
    match &args[0] {
        Value::Str(s) => Value::Number(s.len() as f64),
        Value::List(items) => Value::Number(items.borrow().len() as f64),
        Value::Map(entries) => Value::Number(entries.borrow().len() as f64),
        _ => Value::Number(0.0),
    }
}

/// range(stop) | range(start, stop) | range(start, stop, step).
/// İki argümanlı biçim adımı çıkarsar: start >= stop ise -1, değilse +1.
fn native_range(_interp: &mut Interpreter, args: &[Value]) -> Value {
    let (start, stop, step) = match args.len() {
        1 => (0, num_arg(args, 0) as i64, None),
        2 => (num_arg(args, 0) as i64, num_arg(args, 1) as i64, None),
        _ => (
            num_arg(args, 0) as i64,
            num_arg(args, 1) as i64,
            Some(num_arg(args, 2) as i64),
        ),
    };
    let step = match step {
        Some(0) => {
            eprintln!("error: range() step must not be zero");
            return Value::list(Vec::new());
        }
        Some(s) => s,
        None => {
            if start >= stop {
                -1
            } else {
                1
            }
        }
    };
    let mut items = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            items.push(Value::Number(i as f64));
            i += step;
        }
    } else {
        while i > stop {
            items.push(Value::Number(i as f64));
            i += step;
        }
    }
    Value::list(items)
}

fn native_str(_interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() != 1 {
        eprintln!("error: str() takes 1 argument");
        return Value::string("");
    }
    Value::string(value_to_string(&args[0]))
}

fn native_int(_interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() != 1 {
        eprintln!("error: int() takes 1 argument");
        return Value::Number(0.0);
    }
    match &args[0] {
        Value::Number(n) => Value::Number(n.trunc()),
        Value::Str(s) => Value::Number(parse_leading_int(s) as f64),
        _ => Value::Number(0.0),
    }
}

fn native_float(_interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() != 1 {
        eprintln!("error: float() takes 1 argument");
        return Value::Number(0.0);
    }
    match &args[0] {
        Value::Number(n) => Value::Number(*n),
        Value::Str(s) => Value::Number(parse_leading_float(s)),
        _ => Value::Number(0.0),
    }
}

/// atoi benzeri: baştaki boşluklar, isteğe bağlı işaret, rakam öneki.
/// Parse edilemeyen girdi 0 verir.
fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => (-1, r),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    sign * digits.parse::<i64>().unwrap_or(0)
}

fn parse_leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => (-1.0, r),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut end = 0;
    let bytes = rest.as_bytes();
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    sign * rest[..end].parse::<f64>().unwrap_or(0.0)
}

fn native_type(_interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() != 1 {
        eprintln!("error: type() takes 1 argument");
        return Value::string("unknown");
    }
    Value::string(args[0].type_name())
}

fn native_input(_interp: &mut Interpreter, args: &[Value]) -> Value {
    if let Some(prompt) = args.first() {
        print!("{}", value_to_string(prompt));
        let _ = io::stdout().flush();
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => Value::string(""),
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Value::string(line)
        }
    }
}

fn native_map(interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() != 2 {
        eprintln!("error: map() takes 2 arguments");
        return Value::list(Vec::new());
    }
    let Value::List(items) = &args[0] else {
        eprintln!("error: map() requires a list as first argument");
        return Value::list(Vec::new());
    };
    let items = items.borrow().clone();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(interp.call_function(&args[1], &[item]));
        if !interp.signal().is_none() {
            break;
        }
    }
    Value::list(out)
}

fn native_filter(interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() != 2 {
        eprintln!("error: filter() takes 2 arguments");
        return Value::list(Vec::new());
    }
    let Value::List(items) = &args[0] else {
        eprintln!("error: filter() requires a list as first argument");
        return Value::list(Vec::new());
    };
    let items = items.borrow().clone();
    let mut out = Vec::new();
    for item in items {
        let keep = interp.call_function(&args[1], &[item.clone()]);
        if !interp.signal().is_none() {
            break;
        }
        if keep.is_truthy() {
            out.push(item);
        }
    }
    Value::list(out)
}

/// reduce(list, fn[, init]); init verilmezse ilk eleman tohum olur,
/// boş listede nil döner.
fn native_reduce(interp: &mut Interpreter, args: &[Value]) -> Value {
    if args.len() < 2 {
        eprintln!("error: reduce() takes at least 2 arguments");
        return Value::Nil;
    }
    let Value::List(items) = &args[0] else {
        eprintln!("error: reduce() requires a list as first argument");
        return Value::Nil;
    };
    let items = items.borrow().clone();
    let (mut acc, start) = match args.get(2) {
        Some(init) => (init.clone(), 0),
        None => {
            let Some(first) = items.first() else {
                return Value::Nil;
            };
            (first.clone(), 1)
        }
    };
    for item in items.into_iter().skip(start) {
        acc = interp.call_function(&args[1], &[acc, item]);
        if !interp.signal().is_none() {
            break;
        }
    }
    acc
}

fn native_sum(_interp: &mut Interpreter, args: &[Value]) -> Value {
    let Some(Value::List(items)) = args.first() else {
        return Value::Number(0.0);
    };
    let mut total = 0.0;
    for item in items.borrow().iter() {
        if let Value::Number(n) = item {
            total += n;
        }
    }
    Value::Number(total)
}

fn native_max(_interp: &mut Interpreter, args: &[Value]) -> Value {
    fold_numeric(args, |best, n| n > best)
}

fn native_min(_interp: &mut Interpreter, args: &[Value]) -> Value {
    fold_numeric(args, |best, n| n < best)
}

fn fold_numeric(args: &[Value], better: fn(f64, f64) -> bool) -> Value {
    let Some(Value::List(items)) = args.first() else {
        return Value::Nil;
    };
    let mut best: Option<f64> = None;
    for item in items.borrow().iter() {
        if let Value::Number(n) = item {
            match best {
                Some(b) if !better(b, *n) => {}
                _ => best = Some(*n),
            }
        }
    }
    match best {
        Some(n) => Value::Number(n),
        None => Value::Nil,
    }
}

fn native_abs(_interp: &mut Interpreter, args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Number(n)) => Value::Number(n.abs()),
        _ => Value::Number(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax_analyzer::SyntaxAnalyzer;

    fn run_src(src: &str) -> Interpreter {
        let program = SyntaxAnalyzer::new(src).analyze().expect("parse failed");
        let mut interp = Interpreter::new();
        interp.set_source(src);
        interp.run(&program);
        interp
    }

    fn number(interp: &Interpreter, name: &str) -> f64 {
        match interp.global(name) {
            Some(Value::Number(n)) => n,
            other => panic!("{} is not a number: {:?}", name, other),
        }
    }

    fn list_numbers(interp: &Interpreter, name: &str) -> Vec<f64> {
        let Some(Value::List(items)) = interp.global(name) else {
            panic!("{} is not a list", name);
        };
        let out = items
            .borrow()
            .iter()
            .map(|v| match v {
                Value::Number(n) => *n,
                other => panic!("non-number in {}: {:?}", name, other),
            })
            .collect();
        out
    }

    #[test]
    fn range_forms() {
        let interp = run_src(
            "let a = range(3)\nlet b = range(2, 5)\nlet c = range(5, 2)\nlet d = range(0, 10, 3)\nlet e = range(10, 0, -5)",
        );
        assert_eq!(list_numbers(&interp, "a"), vec![0.0, 1.0, 2.0]);
        assert_eq!(list_numbers(&interp, "b"), vec![2.0, 3.0, 4.0]);
        assert_eq!(list_numbers(&interp, "c"), vec![5.0, 4.0, 3.0]);
        assert_eq!(list_numbers(&interp, "d"), vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(list_numbers(&interp, "e"), vec![10.0, 5.0]);
    }

    #[test]
    fn range_bounds_law() {
        // len(range(a, b)) == b - a, b >= a için
        let interp = run_src("let n = len(range(3, 9))");
        assert_eq!(number(&interp, "n"), 6.0);
    }

    #[test]
    fn len_over_string_list_map() {
        let interp = run_src(
            "let a = len(\"hello\")\nlet b = len([1, 2, 3])\nlet c = len({x: 1, y: 2})\nlet d = len(42)",
        );
        assert_eq!(number(&interp, "a"), 5.0);
        assert_eq!(number(&interp, "b"), 3.0);
        assert_eq!(number(&interp, "c"), 2.0);
        assert_eq!(number(&interp, "d"), 0.0);
    }

    #[test]
    fn conversions() {
        let interp = run_src(
            "let a = int(\"42\")\nlet b = int(\"abc\")\nlet c = int(3.9)\nlet d = float(\"2.5x\")\nlet e = str(7)",
        );
        assert_eq!(number(&interp, "a"), 42.0);
        assert_eq!(number(&interp, "b"), 0.0);
        assert_eq!(number(&interp, "c"), 3.0);
        assert_eq!(number(&interp, "d"), 2.5);
        assert!(matches!(interp.global("e"), Some(Value::Str(s)) if s.as_ref() == "7"));
    }

    #[test]
    fn type_names() {
        let interp = run_src(
            "let a = type(nil)\nlet b = type(1)\nlet c = type([])\nlet d = type(print)\nlet e = type(fn() => 1)",
        );
        let get = |n: &str| match interp.global(n) {
            Some(Value::Str(s)) => s.to_string(),
            other => panic!("{} is not a string: {:?}", n, other),
        };
        assert_eq!(get("a"), "nil");
        assert_eq!(get("b"), "number");
        assert_eq!(get("c"), "list");
        assert_eq!(get("d"), "native_function");
        assert_eq!(get("e"), "function");
    }

    #[test]
    fn map_filter_reduce() {
        let interp = run_src(
            "let xs = [1, 2, 3, 4, 5]\nlet doubled = map(xs, fn(x) => x * 2)\nlet evens = filter(xs, fn(x) => x % 2 == 0)\nlet total = reduce(xs, fn(a, b) => a + b, 0)\nlet seeded = reduce(xs, fn(a, b) => a + b)\nlet empty = reduce([], fn(a, b) => a + b)",
        );
        assert_eq!(list_numbers(&interp, "doubled"), vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(list_numbers(&interp, "evens"), vec![2.0, 4.0]);
        assert_eq!(number(&interp, "total"), 15.0);
        assert_eq!(number(&interp, "seeded"), 15.0);
        assert!(matches!(interp.global("empty"), Some(Value::Nil)));
    }

    #[test]
    fn numeric_utilities() {
        let interp = run_src(
            "let s = sum([1, 2, \"x\", 3])\nlet mx = max([3, 9, 4])\nlet mn = min([3, 9, 4])\nlet none = max([])\nlet a = abs(-4)",
        );
        assert_eq!(number(&interp, "s"), 6.0);
        assert_eq!(number(&interp, "mx"), 9.0);
        assert_eq!(number(&interp, "mn"), 3.0);
        assert!(matches!(interp.global("none"), Some(Value::Nil)));
        assert_eq!(number(&interp, "a"), 4.0);
    }

    #[test]
    fn builtins_are_const() {
        let interp = run_src("print = 5");
        assert!(matches!(interp.global("print"), Some(Value::Native(_))));
    }

    #[test]
    fn display_forms() {
        let v = Value::list(vec![
            Value::Number(1.0),
            Value::string("two"),
            Value::Nil,
            Value::Bool(true),
        ]);
        assert_eq!(value_to_string(&v), "[1, \"two\", nil, true]");
        assert_eq!(value_to_string(&Value::Number(16.0)), "16");
        assert_eq!(value_to_string(&Value::Number(2.25)), "2.25");
    }

    #[test]
    fn leading_number_parsing() {
        assert_eq!(parse_leading_int("  42abc"), 42);
        assert_eq!(parse_leading_int("-7"), -7);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_float("2.5x"), 2.5);
        assert_eq!(parse_leading_float("-0.5"), -0.5);
        assert_eq!(parse_leading_float("x"), 0.0);
    }
}
