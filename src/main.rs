//! Veris interpreter: dosya yürütme, REPL ya da örnek programlar.
//!
//! Kullanım:
//!   veris <dosya.ver>
//!   veris              # REPL
//!   veris --examples

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use veris::ast::{ExprKind, Stmt, StmtKind};
use veris::native::value_to_string;
use veris::{Interpreter, SyntaxAnalyzer, Value};

/// Tree-walking interpreter for the Veris scripting language.
///
/// Note: `and`/`or` evaluate both operands (no short-circuiting).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script to execute; starts the REPL when omitted.
    file: Option<PathBuf>,

    /// Run the built-in demo programs and exit.
    #[arg(long)]
    examples: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.examples {
        run_examples();
        return ExitCode::SUCCESS;
    }

    match args.file {
        Some(path) => run_file(&path),
        None => {
            repl();
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &Path) -> ExitCode {
    let src = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot read {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut sa = SyntaxAnalyzer::new(&src);
    match sa.analyze() {
        Ok(program) => {
            let mut interp = Interpreter::new();
            interp.set_source(&src);
            interp.run(&program);
            ExitCode::SUCCESS
        }
        Err(errs) => {
            for e in errs {
                eprintln!("{}: {}", path.display(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn repl() {
    println!("============================================================");
    println!("Veris REPL - interactive interpreter");
    println!("============================================================");
    println!("Type 'exit' or 'quit' to leave");
    println!("Type 'help' to see the available commands");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut interp = Interpreter::new();

    loop {
        print!("ver> ");
        let _ = stdout.flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            println!("\nGoodbye!");
            break;
        }
        let line = line.trim_end();

        match line {
            "" => continue,
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!();
                println!("Commands:");
                println!("  exit, quit    - leave the REPL");
                println!("  help          - show this message");
                println!("  vars          - list the global variables");
                println!("  clear         - reset the interpreter state");
                println!();
                println!("Examples:");
                println!("  let x = 10");
                println!("  fn square(n) => n * n");
                println!("  print(square(5))");
            }
            "vars" => {
                println!("Global variables:");
                for b in interp.globals().borrow().iter() {
                    println!("  {} = {}", b.name, value_to_string(&b.value));
                }
            }
            "clear" => {
                interp = Interpreter::new();
                println!("Interpreter state cleared.");
            }
            _ => run_line(&mut interp, line),
        }
    }
}

fn run_line(interp: &mut Interpreter, line: &str) {
    let mut sa = SyntaxAnalyzer::new(line);
    match sa.analyze() {
        Ok(program) => {
            interp.set_source(line);
            for stmt in &program.stmts {
                let v = interp.exec_stmt(stmt);
                if !interp.signal().is_none() {
                    break;
                }
                if echoes_result(stmt) && !matches!(v, Value::Nil) {
                    println!("{}", value_to_string(&v));
                }
            }
            interp.take_signal();
        }
        Err(errs) => {
            for e in errs {
                eprintln!("{}", e);
            }
        }
    }
}

/// Tanımlamalar (let/fn/class) sonuçlarını yankılamaz; diğer statement'lar
/// nil olmayan değerlerini yazdırır.
fn echoes_result(stmt: &Stmt) -> bool {
    match &stmt.node {
        StmtKind::Let { .. } | StmtKind::Class { .. } => false,
        StmtKind::Expr(e) => !matches!(e.node, ExprKind::Fn(_)),
        _ => true,
    }
}

fn run_snippet(src: &str) {
    let mut sa = SyntaxAnalyzer::new(src);
    match sa.analyze() {
        Ok(program) => {
            let mut interp = Interpreter::new();
            interp.set_source(src);
            interp.run(&program);
        }
        Err(errs) => {
            for e in errs {
                eprintln!("{}", e);
            }
        }
    }
}

fn run_examples() {
    println!("============================================================");
    println!("Veris - demo programs");
    println!("============================================================");

    println!("\nExample 1: variables and functions");
    run_snippet(
        r#"
let name = "Ada"
fn greet(person)
    print("Hello, " + person + "!")
end
greet(name)
"#,
    );

    println!("\nExample 2: lists and iteration");
    run_snippet(
        r#"
let numbers = [1, 2, 3, 4, 5]
print("numbers:", numbers)
for n in numbers
    print(n * 2)
end
"#,
    );

    println!("\nExample 3: lambdas and higher-order functions");
    run_snippet(
        r#"
let numbers = [1, 2, 3, 4, 5]
let double = fn(x) => x * 2
print("doubled:", map(numbers, double))
print("squares:", map(numbers, fn(n) => n * n))
print("evens:", filter(numbers, fn(n) => n % 2 == 0))
print("sum:", reduce(numbers, fn(a, b) => a + b, 0))
"#,
    );

    println!("\nExample 4: recursive fibonacci");
    run_snippet(
        r#"
fn fib(n)
    if n < 2
        return n
    end
    return fib(n - 1) + fib(n - 2)
end
print("fib(10) =", fib(10))
"#,
    );

    println!("\nExample 5: classes and methods");
    run_snippet(
        r#"
class Person
    fn __init__(name, age)
        self.name = name
        self.age = age
    end
    fn greet()
        print("Hi, I am " + self.name + " and I am " + str(self.age))
    end
    fn birthday()
        self.age += 1
        print("Happy birthday! Now " + str(self.age))
    end
end
let ada = new Person("Ada", 36)
ada.greet()
ada.birthday()
"#,
    );

    println!("\n============================================================");
    println!("All examples completed.");
    println!("============================================================");
}
