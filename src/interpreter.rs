//! AST-walking interpreter.
//!
//! return/break/continue/throw bant dışı bir `Signal` alanıyla taşınır;
//! her çocuk değerlendirmesinden sonra kontrol edilir. Çalışma zamanı
//! hataları stderr'e raporlanır ve yürütme bir sentinel değerle sürer
//! (nil, sıfıra bölmede 0).

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use crate::ast::*;
use crate::environment::{Environment, SetOutcome};
use crate::include;
use crate::native::{self, value_to_string};
use crate::syntax_analyzer::{line_col, SyntaxAnalyzer};
use crate::value::{values_equal, Class, Function, Instance, Signal, Value};

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,
    signal: Signal,
    source: Option<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        native::install_builtins(&mut globals.borrow_mut());
        Self {
            env: globals.clone(),
            globals,
            signal: Signal::None,
            source: None,
        }
    }

    pub fn set_source(&mut self, src: &str) {
        self.source = Some(src.to_string());
    }

    pub fn globals(&self) -> &Rc<RefCell<Environment>> {
        &self.globals
    }

    /// Global ortamdan isimle değer okur (REPL ve testler için).
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn take_signal(&mut self) -> Signal {
        std::mem::take(&mut self.signal)
    }

    /// Programı baştan sona yürütür. Köke ulaşan tüketilmemiş sinyaller
    /// yürütmeyi sessizce bitirir ve temizlenir.
    pub fn run(&mut self, program: &Program) -> Value {
        let mut last = Value::Nil;
        for stmt in &program.stmts {
            last = self.exec_stmt(stmt);
            if !self.signal.is_none() {
                break;
            }
        }
        self.signal = Signal::None;
        last
    }

    fn report(&self, span: &Span, msg: &str) {
        match &self.source {
            Some(src) => {
                let (line, col) = line_col(src, span.lo);
                eprintln!("error: {} (at {}:{})", msg, line, col);
            }
            None => eprintln!("error: {}", msg),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) {
        for s in stmts {
            self.exec_stmt(s);
            if !self.signal.is_none() {
                break;
            }
        }
    }

    pub fn exec_stmt(&mut self, s: &Stmt) -> Value {
        match &s.node {
            StmtKind::Include(path) => {
                self.exec_include(path, &s.span);
                Value::Nil
            }
            StmtKind::Let { name, is_const, init } => {
                let v = self.eval(init);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                self.env.borrow_mut().define(name.clone(), v.clone(), *is_const);
                v
            }
            StmtKind::Class { name, methods } => {
                let mut ms = Vec::new();
                for m in methods {
                    let Some(mname) = m.name.clone() else { continue };
                    ms.push((
                        mname,
                        Rc::new(Function {
                            params: m.params.clone(),
                            body: Rc::new(m.body.clone()),
                            closure: self.env.clone(),
                        }),
                    ));
                }
                let class = Value::Class(Rc::new(Class {
                    name: name.clone(),
                    methods: ms,
                }));
                self.env.borrow_mut().define(name.clone(), class.clone(), false);
                class
            }
            StmtKind::If { cond, then_b, else_b } => {
                let c = self.eval(cond);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                // gövde için yeni scope açılmaz; let mevcut ortama bağlar
                if c.is_truthy() {
                    self.exec_block(then_b);
                } else if let Some(eb) = else_b {
                    self.exec_block(eb);
                }
                Value::Nil
            }
            StmtKind::For { var, iter, body } => {
                let iterable = self.eval(iter);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let Value::List(items) = iterable else {
                    self.report(&s.span, "for loop requires a list");
                    return Value::Nil;
                };
                let items = items.borrow().clone();
                for item in items {
                    let child =
                        Rc::new(RefCell::new(Environment::with_parent(self.env.clone())));
                    child.borrow_mut().define(var.clone(), item, false);
                    let prev = std::mem::replace(&mut self.env, child);
                    self.exec_block(body);
                    self.env = prev;
                    match &self.signal {
                        Signal::Break => {
                            self.signal = Signal::None;
                            return Value::Nil;
                        }
                        Signal::Continue => {
                            self.signal = Signal::None;
                        }
                        Signal::None => {}
                        // return/throw yukarı taşınır
                        _ => return Value::Nil,
                    }
                }
                Value::Nil
            }
            StmtKind::While { cond, body } => {
                loop {
                    let c = self.eval(cond);
                    if !self.signal.is_none() {
                        return Value::Nil;
                    }
                    if !c.is_truthy() {
                        break;
                    }
                    self.exec_block(body);
                    match &self.signal {
                        Signal::Break => {
                            self.signal = Signal::None;
                            return Value::Nil;
                        }
                        Signal::Continue => {
                            self.signal = Signal::None;
                        }
                        Signal::None => {}
                        _ => return Value::Nil,
                    }
                }
                Value::Nil
            }
            StmtKind::Try { body, catch, finally } => {
                // try gövdesi temiz sinyalle başlar; bekleyen dış sinyal saklanır
                let saved = std::mem::take(&mut self.signal);
                self.exec_block(body);
                if matches!(self.signal, Signal::Throw(_)) {
                    if let Some(clause) = catch {
                        let Signal::Throw(msg) = std::mem::take(&mut self.signal) else {
                            unreachable!()
                        };
                        let child =
                            Rc::new(RefCell::new(Environment::with_parent(self.env.clone())));
                        if let Some(name) = &clause.name {
                            child.borrow_mut().define(name.clone(), Value::string(msg), false);
                        }
                        let prev = std::mem::replace(&mut self.env, child);
                        self.exec_block(&clause.body);
                        self.env = prev;
                    }
                }
                if let Some(fin) = finally {
                    let pending = std::mem::take(&mut self.signal);
                    self.exec_block(fin);
                    if self.signal.is_none() {
                        self.signal = pending;
                    }
                }
                if self.signal.is_none() {
                    self.signal = saved;
                }
                Value::Nil
            }
            StmtKind::Throw(e) => {
                let v = self.eval(e);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                self.signal = Signal::Throw(value_to_string(&v));
                Value::Nil
            }
            StmtKind::Return(e) => {
                let v = match e {
                    Some(e) => self.eval(e),
                    None => Value::Nil,
                };
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                self.signal = Signal::Return(v.clone());
                v
            }
            StmtKind::Break => {
                self.signal = Signal::Break;
                Value::Nil
            }
            StmtKind::Continue => {
                self.signal = Signal::Continue;
                Value::Nil
            }
            StmtKind::Expr(e) => self.eval(e),
        }
    }

    pub fn eval(&mut self, e: &Expr) -> Value {
        match &e.node {
            ExprKind::Nil => Value::Nil,
            ExprKind::Number(n) => Value::Number(*n),
            ExprKind::Str(s) => Value::string(s.clone()),
            ExprKind::Bool(b) => Value::Bool(*b),
            ExprKind::Var(name) => match self.env.borrow().get(name) {
                Some(v) => v,
                None => {
                    self.report(&e.span, &format!("undefined variable `{}`", name));
                    Value::Nil
                }
            },
            ExprKind::List(elems) => {
                let mut items = Vec::with_capacity(elems.len());
                for el in elems {
                    items.push(self.eval(el));
                    if !self.signal.is_none() {
                        return Value::Nil;
                    }
                }
                Value::list(items)
            }
            ExprKind::Map(pairs) => {
                let mut entries: Vec<(Rc<str>, Value)> = Vec::with_capacity(pairs.len());
                for (k, vexpr) in pairs {
                    let v = self.eval(vexpr);
                    if !self.signal.is_none() {
                        return Value::Nil;
                    }
                    // son yazan kazanır, ekleme sırası korunur
                    if let Some(slot) = entries.iter_mut().find(|(ek, _)| ek.as_ref() == k) {
                        slot.1 = v;
                    } else {
                        entries.push((Rc::from(k.as_str()), v));
                    }
                }
                Value::Map(Rc::new(RefCell::new(entries)))
            }
            ExprKind::Fn(f) => {
                let func = Value::Function(Rc::new(Function {
                    params: f.params.clone(),
                    body: Rc::new(f.body.clone()),
                    closure: self.env.clone(),
                }));
                if let Some(name) = &f.name {
                    self.env.borrow_mut().define(name.clone(), func.clone(), false);
                }
                func
            }
            ExprKind::New { class, args } => {
                let class_val = self.env.borrow().get(class);
                let cls = match class_val {
                    Some(Value::Class(c)) => c,
                    Some(_) => {
                        self.report(&e.span, &format!("`{}` is not a class", class));
                        return Value::Nil;
                    }
                    None => {
                        self.report(&e.span, &format!("undefined class `{}`", class));
                        return Value::Nil;
                    }
                };
                let instance = Value::Instance(Rc::new(RefCell::new(Instance {
                    class: cls.clone(),
                    fields: Vec::new(),
                })));
                let mut argv = Vec::with_capacity(args.len());
                for a in args {
                    argv.push(self.eval(a));
                    if !self.signal.is_none() {
                        return Value::Nil;
                    }
                }
                if let Some(init) = cls.method("__init__") {
                    let bound = self.bind_method(init, instance.clone());
                    // kurucunun dönüş değeri yok sayılır
                    self.call_function(&bound, &argv);
                }
                instance
            }
            ExprKind::Call { callee, args } => {
                let f = self.eval(callee);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let mut argv = Vec::with_capacity(args.len());
                for a in args {
                    argv.push(self.eval(a));
                    if !self.signal.is_none() {
                        return Value::Nil;
                    }
                }
                self.call_function(&f, &argv)
            }
            ExprKind::Index { base, index } => {
                let b = self.eval(base);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let i = self.eval(index);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                match (&b, &i) {
                    (Value::List(items), Value::Number(n)) => {
                        let idx = *n as i64;
                        if idx < 0 {
                            return Value::Nil;
                        }
                        items
                            .borrow()
                            .get(idx as usize)
                            .cloned()
                            .unwrap_or(Value::Nil)
                    }
                    (Value::Map(entries), key) => {
                        let key = value_to_string(key);
                        entries
                            .borrow()
                            .iter()
                            .find(|(k, _)| k.as_ref() == key)
                            .map(|(_, v)| v.clone())
                            .unwrap_or(Value::Nil)
                    }
                    _ => Value::Nil,
                }
            }
            ExprKind::Attr { base, name } => {
                let obj = self.eval(base);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                self.attr_lookup(&obj, name)
            }
            ExprKind::AttrAssign { base, name, value } => {
                let obj = self.eval(base);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let v = self.eval(value);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                if let Value::Instance(inst) = &obj {
                    inst.borrow_mut().set_field(name, v.clone());
                }
                v
            }
            ExprKind::Assign { name, value } => {
                let v = self.eval(value);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let outcome = self.env.borrow_mut().set(name, v.clone());
                match outcome {
                    SetOutcome::Assigned => {}
                    SetOutcome::Const => {
                        self.report(&e.span, &format!("constant `{}` cannot be reassigned", name));
                    }
                    SetOutcome::NotFound => {
                        // zincirde yoksa mevcut ortamda yaratılır (globalde değil)
                        self.env.borrow_mut().define(name.clone(), v.clone(), false);
                    }
                }
                v
            }
            ExprKind::CompoundAssign { name, op, value } => {
                let Some(current) = self.env.borrow().get(name) else {
                    self.report(&e.span, &format!("undefined variable `{}`", name));
                    return Value::Nil;
                };
                let v = self.eval(value);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let result = self.eval_binop(*op, &current, &v, &e.span);
                let outcome = self.env.borrow_mut().set(name, result.clone());
                if outcome == SetOutcome::Const {
                    self.report(&e.span, &format!("constant `{}` cannot be reassigned", name));
                }
                result
            }
            ExprKind::Incr { target, dec, prefix } => self.eval_incr(target, *dec, *prefix),
            ExprKind::Binary { op, left, right } => {
                let l = self.eval(left);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let r = self.eval(right);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                self.eval_binop(*op, &l, &r, &e.span)
            }
            ExprKind::Unary { op, inner } => {
                let v = self.eval(inner);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                match op {
                    UnaryOp::Neg => Value::Number(-self.as_number(&v, &e.span)),
                    UnaryOp::Not => Value::Bool(!v.is_truthy()),
                    UnaryOp::BitNot => {
                        Value::Number(!(self.as_number(&v, &e.span) as i64) as f64)
                    }
                }
            }
        }
    }

    fn attr_lookup(&self, obj: &Value, name: &str) -> Value {
        let Value::Instance(inst) = obj else {
            // instance dışındaki değerlerde attribute erişimi nil verir
            return Value::Nil;
        };
        if let Some(v) = inst.borrow().field(name) {
            return v;
        }
        let method = inst.borrow().class.method(name).cloned();
        match method {
            Some(m) => self.bind_method(&m, obj.clone()),
            None => Value::Nil,
        }
    }

    /// Metodu, closure'u `self = instance` tanımlayan bir çocuk ortamla
    /// genişletilmiş yeni bir fonksiyon değerine paketler.
    fn bind_method(&self, method: &Rc<Function>, instance: Value) -> Value {
        let env = Rc::new(RefCell::new(Environment::with_parent(method.closure.clone())));
        env.borrow_mut().define("self", instance, false);
        Value::Function(Rc::new(Function {
            params: method.params.clone(),
            body: method.body.clone(),
            closure: env,
        }))
    }

    fn eval_incr(&mut self, target: &Expr, dec: bool, prefix: bool) -> Value {
        let delta = if dec { -1.0 } else { 1.0 };
        match &target.node {
            ExprKind::Var(name) => {
                let Some(current) = self.env.borrow().get(name) else {
                    self.report(&target.span, &format!("undefined variable `{}`", name));
                    return Value::Nil;
                };
                let Value::Number(n) = current else {
                    self.report(
                        &target.span,
                        &format!("++/-- require a number, got {}", current.type_name()),
                    );
                    return Value::Nil;
                };
                let new = Value::Number(n + delta);
                if self.env.borrow_mut().set(name, new.clone()) == SetOutcome::Const {
                    self.report(&target.span, &format!("constant `{}` cannot be reassigned", name));
                }
                if prefix {
                    new
                } else {
                    Value::Number(n)
                }
            }
            ExprKind::Attr { base, name } => {
                let obj = self.eval(base);
                if !self.signal.is_none() {
                    return Value::Nil;
                }
                let Value::Instance(inst) = obj else {
                    return Value::Nil;
                };
                let current = inst.borrow().field(name);
                match current {
                    Some(Value::Number(n)) => {
                        let new = Value::Number(n + delta);
                        inst.borrow_mut().set_field(name, new.clone());
                        if prefix {
                            new
                        } else {
                            Value::Number(n)
                        }
                    }
                    Some(other) => {
                        self.report(
                            &target.span,
                            &format!("++/-- require a number, got {}", other.type_name()),
                        );
                        Value::Nil
                    }
                    None => Value::Nil,
                }
            }
            // parser yalnızca Var/Attr hedeflerine izin verir
            _ => Value::Nil,
        }
    }

    /// Sayısal bağlamda zorlamalı dönüşüm: bool 0/1 sayılır, diğer tipler
    /// raporlanır ve 0 olarak işlem görür.
    fn as_number(&self, v: &Value, span: &Span) -> f64 {
        match v {
            Value::Number(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => {
                self.report(span, &format!("expected a number, got {}", other.type_name()));
                0.0
            }
        }
    }

    fn eval_binop(&mut self, op: BinOp, l: &Value, r: &Value, span: &Span) -> Value {
        match op {
            BinOp::Add => self.eval_add(l, r, span),
            BinOp::Sub => Value::Number(self.as_number(l, span) - self.as_number(r, span)),
            BinOp::Mul => Value::Number(self.as_number(l, span) * self.as_number(r, span)),
            BinOp::Div => {
                let a = self.as_number(l, span);
                let b = self.as_number(r, span);
                if b == 0.0 {
                    self.report(span, "division by zero");
                    return Value::Number(0.0);
                }
                Value::Number(a / b)
            }
            BinOp::Rem => {
                let a = self.as_number(l, span) as i64;
                let b = self.as_number(r, span) as i64;
                if b == 0 {
                    self.report(span, "division by zero");
                    return Value::Number(0.0);
                }
                Value::Number((a % b) as f64)
            }
            BinOp::Pow => {
                Value::Number(self.as_number(l, span).powf(self.as_number(r, span)))
            }
            BinOp::Eq => Value::Bool(values_equal(l, r)),
            BinOp::Ne => Value::Bool(!values_equal(l, r)),
            BinOp::Lt => Value::Bool(self.as_number(l, span) < self.as_number(r, span)),
            BinOp::Le => Value::Bool(self.as_number(l, span) <= self.as_number(r, span)),
            BinOp::Gt => Value::Bool(self.as_number(l, span) > self.as_number(r, span)),
            BinOp::Ge => Value::Bool(self.as_number(l, span) >= self.as_number(r, span)),
            // and/or kısa devre yapmaz: her iki taraf da değerlendirilmiş gelir
            BinOp::And => Value::Bool(l.is_truthy() && r.is_truthy()),
            BinOp::Or => Value::Bool(l.is_truthy() || r.is_truthy()),
            BinOp::BitAnd => Value::Number(
                ((self.as_number(l, span) as i64) & (self.as_number(r, span) as i64)) as f64,
            ),
            BinOp::BitOr => Value::Number(
                ((self.as_number(l, span) as i64) | (self.as_number(r, span) as i64)) as f64,
            ),
            BinOp::BitXor => Value::Number(
                ((self.as_number(l, span) as i64) ^ (self.as_number(r, span) as i64)) as f64,
            ),
        }
    }

    /// `+` çok biçimlidir: taraflardan biri string ise birleştirme, listeler
    /// birleştirilir, liste + tekil değer yeni liste üretir, aksi halde
    /// sayısal toplama.
    fn eval_add(&mut self, l: &Value, r: &Value, span: &Span) -> Value {
        if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
            return Value::string(format!("{}{}", value_to_string(l), value_to_string(r)));
        }
        match (l, r) {
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Value::list(items)
            }
            (Value::List(a), other) => {
                let mut items = a.borrow().clone();
                items.push(other.clone());
                Value::list(items)
            }
            (other, Value::List(b)) => {
                let mut items = vec![other.clone()];
                items.extend(b.borrow().iter().cloned());
                Value::list(items)
            }
            _ => Value::Number(self.as_number(l, span) + self.as_number(r, span)),
        }
    }

    /// Kullanıcı fonksiyonu: closure'un çocuğu taze bir ortamda, parametreler
    /// konumsal bağlanır (eksik argüman nil, fazlası yok sayılır). Return
    /// sinyali burada tüketilir; gövde sinyalsiz biterse son ifadenin değeri
    /// döner.
    pub fn call_function(&mut self, f: &Value, args: &[Value]) -> Value {
        match f {
            Value::Native(nf) => nf(self, args),
            Value::Function(func) => {
                let child =
                    Rc::new(RefCell::new(Environment::with_parent(func.closure.clone())));
                for (i, p) in func.params.iter().enumerate() {
                    let v = args.get(i).cloned().unwrap_or(Value::Nil);
                    child.borrow_mut().define(p.clone(), v, false);
                }
                let prev = std::mem::replace(&mut self.env, child);
                let mut last = Value::Nil;
                for s in func.body.iter() {
                    last = self.exec_stmt(s);
                    match &self.signal {
                        Signal::None => {}
                        Signal::Return(_) => {
                            let Signal::Return(v) = std::mem::take(&mut self.signal) else {
                                unreachable!()
                            };
                            self.env = prev;
                            return v;
                        }
                        // break/continue/throw çağrıdan dışarı taşınır
                        _ => break,
                    }
                }
                self.env = prev;
                last
            }
            other => {
                eprintln!("error: value of type {} is not callable", other.type_name());
                Value::Nil
            }
        }
    }

    fn exec_include(&mut self, path: &str, span: &Span) {
        let Some(resolved) = include::resolve(path) else {
            self.report(span, &format!("include not found: {}", path));
            return;
        };
        let src = match fs::read_to_string(&resolved) {
            Ok(s) => s,
            Err(err) => {
                self.report(span, &format!("cannot read {}: {}", resolved.display(), err));
                return;
            }
        };
        let mut sa = SyntaxAnalyzer::new(&src);
        match sa.analyze() {
            Err(errs) => {
                // include hataları raporlanır ama ölümcül değildir
                for e in errs {
                    eprintln!("{}: {}", resolved.display(), e);
                }
            }
            Ok(program) => {
                // dahil edilen dosya, o anki ortamdan bağımsız olarak
                // global ortamda yürütülür
                let prev_env = std::mem::replace(&mut self.env, self.globals.clone());
                let prev_src = std::mem::replace(&mut self.source, Some(src));
                self.exec_block(&program.stmts);
                self.env = prev_env;
                self.source = prev_src;
            }
        }
    }
}
