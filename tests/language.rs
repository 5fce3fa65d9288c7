use veris::native::value_to_string;
use veris::{Interpreter, SyntaxAnalyzer, Value};

fn run(src: &str) -> Interpreter {
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

fn string_form(interp: &Interpreter, name: &str) -> String {
    value_to_string(&interp.global(name).expect("missing global"))
}

#[test]
fn operator_precedence_end_to_end() {
    let interp = run("let r = 1 + 2 * 3");
    assert_eq!(string_form(&interp, "r"), "7");
}

#[test]
fn for_over_range_collects_in_order() {
    let interp = run(
        r#"
let seen = []
for i in range(1, 4)
    seen = seen + [i]
end
"#,
    );
    assert_eq!(string_form(&interp, "seen"), "[1, 2, 3]");
}

#[test]
fn recursive_fibonacci() {
    let interp = run(
        r#"
fn fib(n)
    if n < 2
        return n
    end
    return fib(n - 1) + fib(n - 2)
end
let r = fib(10)
"#,
    );
    assert_eq!(number(&interp, "r"), 55.0);
}

#[test]
fn class_with_init_and_compound_attr_assign() {
    let interp = run(
        r#"
class C
    fn __init__(x)
        self.x = x
    end
    fn inc()
        self.x += 1
        return self.x
    end
end
let c = new C(10)
let a = c.inc()
let b = c.inc()
"#,
    );
    assert_eq!(number(&interp, "a"), 11.0);
    assert_eq!(number(&interp, "b"), 12.0);
}

#[test]
fn reduce_sums_a_list() {
    let interp = run(
        r#"
let xs = [1, 2, 3, 4, 5]
let total = reduce(xs, fn(a, b) => a + b, 0)
"#,
    );
    assert_eq!(number(&interp, "total"), 15.0);
}

#[test]
fn list_building_loop_prints_squares() {
    let interp = run(
        r#"
let xs = []
for i in range(5)
    xs = xs + [i * i]
end
"#,
    );
    assert_eq!(string_form(&interp, "xs"), "[0, 1, 4, 9, 16]");
}

#[test]
fn closure_counter_law() {
    let interp = run(
        r#"
fn make()
    let c = 0
    return fn() => c = c + 1
end
let tick = make()
let a = tick()
let b = tick()
let c = tick()
"#,
    );
    assert_eq!(number(&interp, "a"), 1.0);
    assert_eq!(number(&interp, "b"), 2.0);
    assert_eq!(number(&interp, "c"), 3.0);
}

#[test]
fn independent_closures_do_not_share_state() {
    let interp = run(
        r#"
fn make()
    let c = 0
    return fn() => c = c + 1
end
let t1 = make()
let t2 = make()
t1()
t1()
let a = t1()
let b = t2()
"#,
    );
    assert_eq!(number(&interp, "a"), 3.0);
    assert_eq!(number(&interp, "b"), 1.0);
}

#[test]
fn const_immutability_law() {
    let interp = run("const x = 1\nx = 2");
    assert_eq!(number(&interp, "x"), 1.0);
}

#[test]
fn list_concat_length_law() {
    let interp = run(
        r#"
let a = [1, 2, 3]
let b = ["x", nil]
let n = len(a + b)
let m = len(a) + len(b)
"#,
    );
    assert_eq!(number(&interp, "n"), number(&interp, "m"));
}

#[test]
fn range_bounds_law() {
    let interp = run("let n = len(range(2, 9))");
    assert_eq!(number(&interp, "n"), 7.0);
}

#[test]
fn method_self_binding_law() {
    // let m = o.method; m() davranışı o.method() ile aynıdır
    let interp = run(
        r#"
class Greeter
    fn __init__(name)
        self.name = name
    end
    fn who()
        return self.name
    end
end
let o = new Greeter("ada")
let direct = o.who()
let m = o.who
let detached = m()
"#,
    );
    assert_eq!(string_form(&interp, "direct"), "ada");
    assert_eq!(string_form(&interp, "detached"), "ada");
}

#[test]
fn pure_expression_evaluates_consistently() {
    let interp = run(
        r#"
let a = (3 + 4) * 2 ** 2 - 10 % 3
let b = (3 + 4) * 2 ** 2 - 10 % 3
"#,
    );
    assert_eq!(number(&interp, "a"), number(&interp, "b"));
}

#[test]
fn try_catch_finally_ordering() {
    let interp = run(
        r#"
let log = []
fn risky()
    throw "kaboom"
end
try
    log = log + ["try"]
    risky()
    log = log + ["unreachable"]
catch (e)
    log = log + [e]
finally
    log = log + ["finally"]
end
"#,
    );
    assert_eq!(
        string_form(&interp, "log"),
        "[\"try\", \"kaboom\", \"finally\"]"
    );
}

#[test]
fn throw_without_catch_stops_program() {
    let interp = run("let a = 1\nthrow \"stop\"\nlet b = 2");
    assert_eq!(number(&interp, "a"), 1.0);
    assert!(interp.global("b").is_none());
}

#[test]
fn nested_loops_break_only_innermost() {
    let interp = run(
        r#"
let hits = 0
for i in range(3)
    for j in range(10)
        if j == 1
            break
        end
        hits = hits + 1
    end
end
"#,
    );
    assert_eq!(number(&interp, "hits"), 3.0);
}

#[test]
fn while_loop_with_compound_assign() {
    let interp = run(
        r#"
let n = 1
while n < 100
    n *= 2
end
"#,
    );
    assert_eq!(number(&interp, "n"), 128.0);
}

#[test]
fn map_literal_preserves_insertion_order() {
    let interp = run("let m = {b: 2, a: 1, c: 3}");
    assert_eq!(string_form(&interp, "m"), "{b: 2, a: 1, c: 3}");
}

#[test]
fn map_duplicate_keys_last_write_wins() {
    let interp = run("let m = {a: 1, a: 2}\nlet n = len(m)\nlet v = m[\"a\"]");
    assert_eq!(number(&interp, "n"), 1.0);
    assert_eq!(number(&interp, "v"), 2.0);
}

#[test]
fn include_runs_in_global_scope() {
    let dir = std::env::temp_dir().join("veris-lang-test");
    std::fs::create_dir_all(&dir).unwrap();
    let lib_path = dir.join("shared.ver");
    std::fs::write(&lib_path, "let shared = 99\nfn helper(x) => x + 1\n").unwrap();

    // fonksiyon gövdesinden include edilse de tanımlar globalde biter
    let src = format!(
        "fn load()\ninclude \"{}\"\nend\nload()\nlet r = helper(shared)",
        lib_path.display()
    );
    let interp = run(&src);
    assert_eq!(number(&interp, "r"), 100.0);

    std::fs::remove_file(&lib_path).ok();
}

#[test]
fn include_missing_is_reported_not_fatal() {
    let interp = run("include \"no-such-library-anywhere\"\nlet after = 1");
    assert_eq!(number(&interp, "after"), 1.0);
}

#[test]
fn string_escapes_round_trip_through_len() {
    let interp = run("let n = len(\"a\\nb\")");
    assert_eq!(number(&interp, "n"), 3.0);
}

#[test]
fn prefix_and_postfix_increment_on_fields() {
    let interp = run(
        r#"
class Box
    fn __init__()
        self.v = 10
    end
end
let b = new Box()
let old = b.v++
let new_v = ++b.v
"#,
    );
    assert_eq!(number(&interp, "old"), 10.0);
    assert_eq!(number(&interp, "new_v"), 12.0);
}

#[test]
fn elif_chain_selects_first_truthy_branch() {
    let interp = run(
        r#"
fn grade(score)
    if score >= 90
        return "A"
    elif score >= 80
        return "B"
    elif score >= 70
        return "C"
    else
        return "F"
    end
end
let a = grade(95)
let b = grade(85)
let c = grade(71)
let f = grade(10)
"#,
    );
    assert_eq!(string_form(&interp, "a"), "A");
    assert_eq!(string_form(&interp, "b"), "B");
    assert_eq!(string_form(&interp, "c"), "C");
    assert_eq!(string_form(&interp, "f"), "F");
}
