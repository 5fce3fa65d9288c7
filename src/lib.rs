//! Veris — SyntaxAnalyzer (lexer+parser), AST ve AST-walking interpreter.
//!
//! Kaynak `.ver` dosyaları token akışına, oradan AST'ye çevrilir ve özyinelemeli
//! bir değerlendirici lexical scope zinciri üzerinde yürütür. return/break/
//! continue/throw, değerlendirici üzerindeki açık bir `Signal` alanıyla taşınır.
//!
//! Not: `and`/`or` kısa devre yapmaz; her iki işlenen de değerlendirilir ve
//! sonuç doğruluk değerlerinin birleşimidir.

pub mod ast;
pub mod environment;
pub mod include;
pub mod interpreter;
pub mod native;
pub mod syntax_analyzer;
pub mod value;

pub use ast::{Expr, Program, Stmt};
pub use interpreter::Interpreter;
pub use syntax_analyzer::{SyntaxAnalyzer, SyntaxError, Token};
pub use value::{Signal, Value};
