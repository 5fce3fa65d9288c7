//! SyntaxAnalyzer: logos tabanli lexer + parser + hata raporlama.
//!
//! Lexer newline'ları gerçek token olarak üretir; parser kurulurken
//! bunlar ayıklanır (satır sonları dilbilgisinde anlam taşımaz).

use logos::Logos;

use crate::ast::*;
use crate::value::fmt_number;

#[derive(Logos, Clone, Debug, PartialEq)]
pub enum Token {
    // Keywords
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("fn")]
    Fn,
    #[token("class")]
    Class,
    #[token("new")]
    New,
    #[token("self")]
    SelfKw,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("match")]
    Match,
    #[token("case")]
    Case,
    #[token("end")]
    End,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("include")]
    Include,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("throw")]
    Throw,

    // Literals
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r#""([^"\\]|\\[\s\S])*""#, unescape_string)]
    #[regex(r"'([^'\\]|\\[\s\S])*'", unescape_string)]
    Str(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Operators (çok karakterli olanlar önceliklidir)
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("**")]
    StarStar,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("=>")]
    FatArrow,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Assign,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    /// Satır sonu; parser kurulurken atılır.
    #[token("\n")]
    Newline,

    // Skip kuralları Eof'a iliştirilmiştir; Eof lexer tarafından üretilmez,
    // token akışının sonuna elle eklenir.
    #[regex(r"[ \t\r]+", logos::skip)]
    #[regex(r"#[^\n]*", logos::skip)]
    Eof,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }
}

fn unescape_string(lex: &mut logos::Lexer<Token>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            // \<herhangi> -> <herhangi>
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub pos: (usize, usize), // line-column (1-based)
    pub detail: String,
}

impl SyntaxError {
    pub fn new(pos: (usize, usize), detail: String) -> Self {
        Self { pos, detail }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error at {}:{}: {}", self.pos.0, self.pos.1, self.detail)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug)]
pub struct SyntaxAnalyzer {
    source: String,
    tokens: Vec<(Token, Span)>,
}

impl SyntaxAnalyzer {
    pub fn new(source: &str) -> Self {
        let mut sa = Self {
            source: source.to_string(),
            tokens: Vec::new(),
        };
        sa.lex();
        sa
    }

    /// Parse aşaması; hata listesi döner, süreci asla kendisi sonlandırmaz.
    pub fn analyze(&mut self) -> Result<Program, Vec<SyntaxError>> {
        match Parser::new(self.tokens.clone()).parse() {
            Ok(program) => Ok(program),
            Err(errs) => {
                let mut out = Vec::new();
                for e in errs {
                    let pos = match e.1 {
                        Some(span) => line_col(&self.source, span.lo),
                        None => (1, 1),
                    };
                    out.push(SyntaxError::new(pos, e.0));
                }
                Err(out)
            }
        }
    }

    pub fn tokens(&self) -> &[(Token, Span)] {
        &self.tokens
    }

    /// Tanınmayan karakterler stderr'e raporlanır ve atlanır; lexing
    /// her girdi için tamamlanır ve Eof ile biter.
    fn lex(&mut self) {
        let src = self.source.clone();
        let mut lexer = Token::lexer(&src);
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            match result {
                Ok(tok) => {
                    self.tokens.push((tok, Span { lo: span.start, hi: span.end }));
                }
                Err(()) => {
                    let (line, col) = line_col(&src, span.start);
                    eprintln!(
                        "lex error: unexpected character `{}` at {}:{}",
                        &src[span.start..span.end],
                        line,
                        col
                    );
                }
            }
        }
        self.tokens.push((
            Token::Eof,
            Span {
                lo: src.len(),
                hi: src.len(),
            },
        ));
    }
}

pub fn line_col(src: &str, idx: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in src.char_indices() {
        if i >= idx {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

// ===== Parser =====

type TokenStream = std::iter::Peekable<std::vec::IntoIter<(Token, Span)>>;

#[derive(Debug)]
struct ParseError(pub String, pub Option<Span>);

struct Parser {
    tokens: TokenStream,
    last_span: Span,
    errs: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        // Newline'lar burada ayıklanır; dilbilgisi satır sonu görmez.
        let filtered: Vec<(Token, Span)> = tokens
            .into_iter()
            .filter(|(t, _)| !matches!(t, Token::Newline))
            .collect();
        Self {
            tokens: filtered.into_iter().peekable(),
            last_span: Span { lo: 0, hi: 0 },
            errs: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        self.tokens.peek().map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let next = self.tokens.next()?;
        self.last_span = next.1.clone();
        Some(next)
    }

    fn err(&mut self, msg: String) {
        self.errs.push(ParseError(msg, Some(self.last_span.clone())));
    }

    fn is(&mut self, t: &Token) -> bool {
        match self.peek() {
            Some(a) => std::mem::discriminant(a) == std::mem::discriminant(t),
            None => false,
        }
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.is(t) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: Token) -> Result<Span, ()> {
        match self.advance() {
            Some((t, span)) => {
                if std::mem::discriminant(&t) == std::mem::discriminant(&want) {
                    Ok(span)
                } else {
                    self.err(format!("expected {:?}, got {:?}", want, t));
                    Err(())
                }
            }
            None => {
                self.err(format!("expected {:?}, got end of input", want));
                Err(())
            }
        }
    }

    fn expect_ident(&mut self) -> Option<String> {
        match self.advance() {
            Some((Token::Ident(s), _)) => Some(s),
            Some((t, _)) => {
                self.err(format!("expected identifier, got {:?}", t));
                None
            }
            None => {
                self.err("expected identifier, got end of input".into());
                None
            }
        }
    }

    fn expect_str(&mut self) -> Option<String> {
        match self.advance() {
            Some((Token::Str(s), _)) => Some(s),
            _ => {
                self.err("expected string literal".into());
                None
            }
        }
    }

    fn make_expr(&self, span: Span, node: ExprKind) -> Expr {
        Expr { node, span }
    }

    fn make_stmt(&self, span: Span, node: StmtKind) -> Stmt {
        Stmt { node, span }
    }

    fn parse(mut self) -> Result<Program, Vec<ParseError>> {
        let mut stmts = Vec::new();
        while !self.is(&Token::Eof) {
            match self.parse_stmt() {
                Some(s) => stmts.push(s),
                None => break,
            }
        }
        if !self.errs.is_empty() {
            return Err(self.errs);
        }
        Ok(Program { stmts })
    }

    /// `stops`'tan biri görünene kadar statement toplar. Terminatörü tüketmez.
    fn block_until(&mut self, stops: &[Token]) -> Option<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            let mut at_stop = false;
            for t in stops {
                if self.is(t) {
                    at_stop = true;
                    break;
                }
            }
            if at_stop {
                break;
            }
            if self.is(&Token::Eof) {
                self.err("unexpected end of input, expected `end`".into());
                return None;
            }
            stmts.push(self.parse_stmt()?);
        }
        Some(stmts)
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        if self.eat(&Token::Include) {
            let start = self.last_span.clone();
            let path = if self.eat(&Token::LParen) {
                let p = self.expect_str()?;
                self.expect(Token::RParen).ok()?;
                p
            } else {
                self.expect_str()?
            };
            let span = Span { lo: start.lo, hi: self.last_span.hi };
            return Some(self.make_stmt(span, StmtKind::Include(path)));
        }
        if self.eat(&Token::Let) {
            let start = self.last_span.clone();
            return self.parse_let(start, false);
        }
        if self.eat(&Token::Const) {
            let start = self.last_span.clone();
            return self.parse_let(start, true);
        }
        if self.eat(&Token::Fn) {
            let start = self.last_span.clone();
            let f = self.parse_fn_lit()?;
            let span = Span { lo: start.lo, hi: self.last_span.hi };
            let e = self.make_expr(span.clone(), ExprKind::Fn(f));
            return Some(self.make_stmt(span, StmtKind::Expr(e)));
        }
        if self.eat(&Token::Class) {
            return self.parse_class();
        }
        if self.eat(&Token::If) {
            let s = self.parse_if_arm()?;
            self.expect(Token::End).ok()?;
            return Some(s);
        }
        if self.eat(&Token::For) {
            return self.parse_for();
        }
        if self.eat(&Token::While) {
            return self.parse_while();
        }
        if self.eat(&Token::Try) {
            return self.parse_try();
        }
        if self.eat(&Token::Throw) {
            let start = self.last_span.clone();
            let e = self.parse_expr()?;
            let span = Span { lo: start.lo, hi: e.span.hi };
            return Some(self.make_stmt(span, StmtKind::Throw(e)));
        }
        if self.eat(&Token::Return) {
            let start = self.last_span.clone();
            if self.is(&Token::End) || self.is(&Token::Eof) {
                return Some(self.make_stmt(start, StmtKind::Return(None)));
            }
            let e = self.parse_expr()?;
            let span = Span { lo: start.lo, hi: e.span.hi };
            return Some(self.make_stmt(span, StmtKind::Return(Some(e))));
        }
        if self.eat(&Token::Break) {
            let span = self.last_span.clone();
            return Some(self.make_stmt(span, StmtKind::Break));
        }
        if self.eat(&Token::Continue) {
            let span = self.last_span.clone();
            return Some(self.make_stmt(span, StmtKind::Continue));
        }
        let e = self.parse_expr()?;
        let span = e.span.clone();
        Some(self.make_stmt(span, StmtKind::Expr(e)))
    }

    fn parse_let(&mut self, start: Span, is_const: bool) -> Option<Stmt> {
        let name = self.expect_ident()?;
        self.expect(Token::Assign).ok()?;
        let init = self.parse_expr()?;
        let span = Span { lo: start.lo, hi: init.span.hi };
        Some(self.make_stmt(span, StmtKind::Let { name, is_const, init }))
    }

    /// `fn` tüketildikten sonra çağrılır: isteğe bağlı ad, parametre listesi,
    /// ardından `=> expr` kısaltması (tek return'e açılır) ya da `end` bloğu.
    fn parse_fn_lit(&mut self) -> Option<FnLit> {
        let name = if matches!(self.peek(), Some(Token::Ident(_))) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(Token::LParen).ok()?;
        let mut params = Vec::new();
        loop {
            if self.eat(&Token::RParen) {
                break;
            }
            params.push(self.expect_ident()?);
            if !self.eat(&Token::Comma) && !self.is(&Token::RParen) {
                self.err("expected `,` between parameters".into());
                return None;
            }
        }
        if self.eat(&Token::FatArrow) {
            let start = self.last_span.clone();
            let e = self.parse_expr()?;
            let span = Span { lo: start.lo, hi: e.span.hi };
            let body = vec![self.make_stmt(span, StmtKind::Return(Some(e)))];
            return Some(FnLit { name, params, body });
        }
        let body = self.block_until(&[Token::End])?;
        self.expect(Token::End).ok()?;
        Some(FnLit { name, params, body })
    }

    fn parse_class(&mut self) -> Option<Stmt> {
        let start = self.last_span.clone();
        let name = self.expect_ident()?;
        let mut methods = Vec::new();
        loop {
            if self.eat(&Token::End) {
                break;
            }
            if self.is(&Token::Eof) {
                self.err("unexpected end of input in class body".into());
                return None;
            }
            if self.eat(&Token::Fn) {
                let f = self.parse_fn_lit()?;
                if f.name.is_none() {
                    self.err("class methods must be named".into());
                    return None;
                }
                methods.push(f);
            } else {
                // sınıf gövdesinde yalnızca metot tanımları anlamlıdır
                self.advance();
            }
        }
        let span = Span { lo: start.lo, hi: self.last_span.hi };
        Some(self.make_stmt(span, StmtKind::Class { name, methods }))
    }

    /// if/elif kolu; `elif` zinciri else koluna iç içe `if` olarak açılır.
    /// Kapanış `end`'ini çağıran tüketir (zincir başına tek `end`).
    fn parse_if_arm(&mut self) -> Option<Stmt> {
        let start = self.last_span.clone();
        let cond = self.parse_expr()?;
        let then_b = self.block_until(&[Token::Elif, Token::Else, Token::End])?;
        let else_b = if self.eat(&Token::Elif) {
            Some(vec![self.parse_if_arm()?])
        } else if self.eat(&Token::Else) {
            Some(self.block_until(&[Token::End])?)
        } else {
            None
        };
        let span = Span { lo: start.lo, hi: self.last_span.hi };
        Some(self.make_stmt(span, StmtKind::If { cond, then_b, else_b }))
    }

    fn parse_for(&mut self) -> Option<Stmt> {
        let start = self.last_span.clone();
        let var = self.expect_ident()?;
        self.expect(Token::In).ok()?;
        let iter = self.parse_expr()?;
        let body = self.block_until(&[Token::End])?;
        self.expect(Token::End).ok()?;
        let span = Span { lo: start.lo, hi: self.last_span.hi };
        Some(self.make_stmt(span, StmtKind::For { var, iter, body }))
    }

    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.last_span.clone();
        let cond = self.parse_expr()?;
        let body = self.block_until(&[Token::End])?;
        self.expect(Token::End).ok()?;
        let span = Span { lo: start.lo, hi: self.last_span.hi };
        Some(self.make_stmt(span, StmtKind::While { cond, body }))
    }

    fn parse_try(&mut self) -> Option<Stmt> {
        let start = self.last_span.clone();
        let body = self.block_until(&[Token::Catch, Token::Finally, Token::End])?;
        let catch = if self.eat(&Token::Catch) {
            let name = if self.eat(&Token::LParen) {
                let n = self.expect_ident()?;
                self.expect(Token::RParen).ok()?;
                Some(n)
            } else if matches!(self.peek(), Some(Token::Ident(_))) {
                Some(self.expect_ident()?)
            } else {
                None
            };
            let cbody = self.block_until(&[Token::Finally, Token::End])?;
            Some(CatchClause { name, body: cbody })
        } else {
            None
        };
        let finally = if self.eat(&Token::Finally) {
            Some(self.block_until(&[Token::End])?)
        } else {
            None
        };
        self.expect(Token::End).ok()?;
        let span = Span { lo: start.lo, hi: self.last_span.hi };
        Some(self.make_stmt(span, StmtKind::Try { body, catch, finally }))
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_expr_assign()
    }

    fn eat_compound(&mut self) -> Option<BinOp> {
        let op = match self.peek() {
            Some(Token::PlusEq) => BinOp::Add,
            Some(Token::MinusEq) => BinOp::Sub,
            Some(Token::StarEq) => BinOp::Mul,
            Some(Token::SlashEq) => BinOp::Div,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// Atama sağdan bağlar; sol taraf yalnızca değişken ya da attribute
    /// olabilir. Attribute compound ataması `o.a OP= v` parse sırasında
    /// `o.a = (o.a OP v)` biçimine açılır.
    fn parse_expr_assign(&mut self) -> Option<Expr> {
        let expr = self.parse_expr_or()?;

        if let ExprKind::Attr { base, name } = &expr.node {
            let (base, name) = (base.clone(), name.clone());
            if self.eat(&Token::Assign) {
                let value = self.parse_expr_assign()?;
                let span = Span { lo: expr.span.lo, hi: value.span.hi };
                return Some(self.make_expr(
                    span,
                    ExprKind::AttrAssign { base, name, value: Box::new(value) },
                ));
            }
            if let Some(op) = self.eat_compound() {
                let rhs = self.parse_expr_assign()?;
                let span = Span { lo: expr.span.lo, hi: rhs.span.hi };
                let read = expr.clone();
                let value = self.make_expr(
                    span.clone(),
                    ExprKind::Binary { op, left: Box::new(read), right: Box::new(rhs) },
                );
                return Some(self.make_expr(
                    span,
                    ExprKind::AttrAssign { base, name, value: Box::new(value) },
                ));
            }
        } else if let ExprKind::Var(name) = &expr.node {
            let name = name.clone();
            if let Some(op) = self.eat_compound() {
                let value = self.parse_expr_assign()?;
                let span = Span { lo: expr.span.lo, hi: value.span.hi };
                return Some(self.make_expr(
                    span,
                    ExprKind::CompoundAssign { name, op, value: Box::new(value) },
                ));
            }
            if self.eat(&Token::Assign) {
                let value = self.parse_expr_assign()?;
                let span = Span { lo: expr.span.lo, hi: value.span.hi };
                return Some(self.make_expr(
                    span,
                    ExprKind::Assign { name, value: Box::new(value) },
                ));
            }
        }

        Some(expr)
    }

    fn parse_expr_or(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_expr_and()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op: BinOp::Or,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    fn parse_expr_and(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_bit_or()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_expr_bit_or()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op: BinOp::And,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    fn parse_expr_bit_or(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_bit_xor()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.parse_expr_bit_xor()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op: BinOp::BitOr,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    fn parse_expr_bit_xor(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_bit_and()?;
        while self.eat(&Token::Caret) {
            let rhs = self.parse_expr_bit_and()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op: BinOp::BitXor,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    fn parse_expr_bit_and(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_cmp()?;
        while self.eat(&Token::Amp) {
            let rhs = self.parse_expr_cmp()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op: BinOp::BitAnd,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    fn parse_expr_cmp(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_add()?;
        loop {
            let op = if self.eat(&Token::EqEq) {
                BinOp::Eq
            } else if self.eat(&Token::Ne) {
                BinOp::Ne
            } else if self.eat(&Token::Lt) {
                BinOp::Lt
            } else if self.eat(&Token::Le) {
                BinOp::Le
            } else if self.eat(&Token::Gt) {
                BinOp::Gt
            } else if self.eat(&Token::Ge) {
                BinOp::Ge
            } else {
                break;
            };
            let rhs = self.parse_expr_add()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    fn parse_expr_add(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_mul()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinOp::Add
            } else if self.eat(&Token::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_expr_mul()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    fn parse_expr_mul(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_expr_power()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinOp::Mul
            } else if self.eat(&Token::Slash) {
                BinOp::Div
            } else if self.eat(&Token::Percent) {
                BinOp::Rem
            } else {
                break;
            };
            let rhs = self.parse_expr_power()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            lhs = self.make_expr(
                span,
                ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            );
        }
        Some(lhs)
    }

    /// `**` sağdan bağlar.
    fn parse_expr_power(&mut self) -> Option<Expr> {
        let lhs = self.parse_expr_unary()?;
        if self.eat(&Token::StarStar) {
            let rhs = self.parse_expr_power()?;
            let span = Span { lo: lhs.span.lo, hi: rhs.span.hi };
            return Some(self.make_expr(
                span,
                ExprKind::Binary {
                    op: BinOp::Pow,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            ));
        }
        Some(lhs)
    }

    fn parse_expr_unary(&mut self) -> Option<Expr> {
        if self.is(&Token::PlusPlus) || self.is(&Token::MinusMinus) {
            let dec = self.is(&Token::MinusMinus);
            self.advance();
            let start = self.last_span.clone();
            let operand = self.parse_expr_postfix()?;
            if matches!(operand.node, ExprKind::Var(_) | ExprKind::Attr { .. }) {
                let span = Span { lo: start.lo, hi: operand.span.hi };
                return Some(self.make_expr(
                    span,
                    ExprKind::Incr { target: Box::new(operand), dec, prefix: true },
                ));
            }
            self.err("++ and -- require a variable or attribute".into());
            return None;
        }
        let op = if self.eat(&Token::Minus) {
            Some(UnaryOp::Neg)
        } else if self.eat(&Token::Not) {
            Some(UnaryOp::Not)
        } else if self.eat(&Token::Tilde) {
            Some(UnaryOp::BitNot)
        } else {
            None
        };
        if let Some(op) = op {
            let start = self.last_span.clone();
            let inner = self.parse_expr_unary()?;
            let span = Span { lo: start.lo, hi: inner.span.hi };
            return Some(self.make_expr(span, ExprKind::Unary { op, inner: Box::new(inner) }));
        }
        self.parse_expr_postfix()
    }

    fn parse_expr_postfix(&mut self) -> Option<Expr> {
        let mut e = self.parse_expr_primary()?;
        loop {
            if self.eat(&Token::LParen) {
                let mut args = Vec::new();
                loop {
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    args.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) && !self.is(&Token::RParen) {
                        self.err("expected `,` between arguments".into());
                        return None;
                    }
                }
                let span = Span { lo: e.span.lo, hi: self.last_span.hi };
                e = self.make_expr(span, ExprKind::Call { callee: Box::new(e), args });
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(Token::RBracket).ok()?;
                let span = Span { lo: e.span.lo, hi: self.last_span.hi };
                e = self.make_expr(
                    span,
                    ExprKind::Index { base: Box::new(e), index: Box::new(index) },
                );
            } else if self.eat(&Token::Dot) {
                let name = self.expect_ident()?;
                let span = Span { lo: e.span.lo, hi: self.last_span.hi };
                e = self.make_expr(span, ExprKind::Attr { base: Box::new(e), name });
            } else if self.is(&Token::PlusPlus) || self.is(&Token::MinusMinus) {
                if !matches!(e.node, ExprKind::Var(_) | ExprKind::Attr { .. }) {
                    break;
                }
                let dec = self.is(&Token::MinusMinus);
                self.advance();
                let span = Span { lo: e.span.lo, hi: self.last_span.hi };
                e = self.make_expr(
                    span,
                    ExprKind::Incr { target: Box::new(e), dec, prefix: false },
                );
            } else {
                break;
            }
        }
        Some(e)
    }

    fn parse_expr_primary(&mut self) -> Option<Expr> {
        let (tok, span) = match self.advance() {
            Some(x) => x,
            None => {
                self.err("unexpected end of input in expression".into());
                return None;
            }
        };
        match tok {
            Token::Number(n) => Some(self.make_expr(span, ExprKind::Number(n))),
            Token::Str(s) => Some(self.make_expr(span, ExprKind::Str(s))),
            Token::True => Some(self.make_expr(span, ExprKind::Bool(true))),
            Token::False => Some(self.make_expr(span, ExprKind::Bool(false))),
            Token::Nil => Some(self.make_expr(span, ExprKind::Nil)),
            // `self` sıradan bir değişken adı gibi çözülür
            Token::SelfKw => Some(self.make_expr(span, ExprKind::Var("self".into()))),
            Token::Ident(name) => Some(self.make_expr(span, ExprKind::Var(name))),
            Token::LParen => {
                let e = self.parse_expr()?;
                self.expect(Token::RParen).ok()?;
                Some(e)
            }
            Token::LBracket => {
                let mut elems = Vec::new();
                loop {
                    if self.eat(&Token::RBracket) {
                        break;
                    }
                    elems.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) && !self.is(&Token::RBracket) {
                        self.err("expected `,` between list elements".into());
                        return None;
                    }
                }
                let full = Span { lo: span.lo, hi: self.last_span.hi };
                Some(self.make_expr(full, ExprKind::List(elems)))
            }
            Token::LBrace => {
                let mut pairs = Vec::new();
                loop {
                    if self.eat(&Token::RBrace) {
                        break;
                    }
                    // Anahtar lexeme'i string olarak saklanır; sayı anahtarlar
                    // görüntü biçimleriyle.
                    let key = match self.advance() {
                        Some((Token::Ident(s), _)) => s,
                        Some((Token::Str(s), _)) => s,
                        Some((Token::Number(n), _)) => fmt_number(n),
                        _ => {
                            self.err("expected map key (identifier, string or number)".into());
                            return None;
                        }
                    };
                    self.expect(Token::Colon).ok()?;
                    let value = self.parse_expr()?;
                    pairs.push((key, value));
                    if !self.eat(&Token::Comma) && !self.is(&Token::RBrace) {
                        self.err("expected `,` between map entries".into());
                        return None;
                    }
                }
                let full = Span { lo: span.lo, hi: self.last_span.hi };
                Some(self.make_expr(full, ExprKind::Map(pairs)))
            }
            Token::Fn => {
                let f = self.parse_fn_lit()?;
                let full = Span { lo: span.lo, hi: self.last_span.hi };
                Some(self.make_expr(full, ExprKind::Fn(f)))
            }
            Token::New => {
                let class = self.expect_ident()?;
                self.expect(Token::LParen).ok()?;
                let mut args = Vec::new();
                loop {
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    args.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) && !self.is(&Token::RParen) {
                        self.err("expected `,` between arguments".into());
                        return None;
                    }
                }
                let full = Span { lo: span.lo, hi: self.last_span.hi };
                Some(self.make_expr(full, ExprKind::New { class, args }))
            }
            other => {
                self.err(format!("unexpected {:?} in expression", other));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        SyntaxAnalyzer::new(src).analyze().expect("parse failed")
    }

    #[test]
    fn lex_ends_with_eof() {
        let sa = SyntaxAnalyzer::new("let x = 1 + 2");
        let toks = sa.tokens();
        assert!(matches!(toks.last(), Some((Token::Eof, _))));
    }

    #[test]
    fn lex_is_total_on_garbage() {
        // tanınmayan karakterler atlanır, akış yine Eof ile biter
        let sa = SyntaxAnalyzer::new("let @ x $ = ; 1");
        assert!(matches!(sa.tokens().last(), Some((Token::Eof, _))));
        let idents = sa
            .tokens()
            .iter()
            .filter(|(t, _)| matches!(t, Token::Ident(_)))
            .count();
        assert_eq!(idents, 1);
    }

    #[test]
    fn lex_multi_char_operators_greedy() {
        let sa = SyntaxAnalyzer::new("++ += ** == != <= >= => --");
        let kinds: Vec<_> = sa.tokens().iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Token::PlusPlus,
                Token::PlusEq,
                Token::StarStar,
                Token::EqEq,
                Token::Ne,
                Token::Le,
                Token::Ge,
                Token::FatArrow,
                Token::MinusMinus,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lex_string_escapes() {
        let sa = SyntaxAnalyzer::new(r#""a\nb\tc\\d\qe" 'tek'"#);
        let strs: Vec<_> = sa
            .tokens()
            .iter()
            .filter_map(|(t, _)| match t {
                Token::Str(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(strs, vec!["a\nb\tc\\dqe".to_string(), "tek".to_string()]);
    }

    #[test]
    fn lex_comments_and_newlines() {
        let sa = SyntaxAnalyzer::new("1 # yorum satiri\n2");
        let kinds: Vec<_> = sa.tokens().iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Number(1.0),
                Token::Newline,
                Token::Number(2.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn precedence_mul_over_add() {
        let p = parse_ok("1 + 2 * 3");
        let StmtKind::Expr(e) = &p.stmts[0].node else { panic!() };
        let ExprKind::Binary { op, right, .. } = &e.node else { panic!() };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(
            right.node,
            ExprKind::Binary { op: BinOp::Mul, .. }
        ));
    }

    #[test]
    fn power_is_right_associative() {
        let p = parse_ok("2 ** 3 ** 2");
        let StmtKind::Expr(e) = &p.stmts[0].node else { panic!() };
        let ExprKind::Binary { op, right, .. } = &e.node else { panic!() };
        assert_eq!(*op, BinOp::Pow);
        assert!(matches!(
            right.node,
            ExprKind::Binary { op: BinOp::Pow, .. }
        ));
    }

    #[test]
    fn lambda_sugar_desugars_to_return() {
        let p = parse_ok("fn(x) => x * 2");
        let StmtKind::Expr(e) = &p.stmts[0].node else { panic!() };
        let ExprKind::Fn(f) = &e.node else { panic!() };
        assert_eq!(f.params, vec!["x"]);
        assert!(matches!(f.body[0].node, StmtKind::Return(Some(_))));
    }

    #[test]
    fn elif_chain_nests_into_else() {
        let p = parse_ok("if a x elif b y else z end");
        let StmtKind::If { else_b, .. } = &p.stmts[0].node else { panic!() };
        let nested = else_b.as_ref().unwrap();
        assert!(matches!(nested[0].node, StmtKind::If { .. }));
    }

    #[test]
    fn try_catch_finally_shapes() {
        let p = parse_ok("try throw \"x\" catch (e) print(e) finally print(1) end");
        let StmtKind::Try { body, catch, finally } = &p.stmts[0].node else { panic!() };
        assert_eq!(body.len(), 1);
        assert_eq!(catch.as_ref().unwrap().name.as_deref(), Some("e"));
        assert!(finally.is_some());
    }

    #[test]
    fn map_number_keys_become_strings() {
        let p = parse_ok("{a: 1, \"b\": 2, 3: 4}");
        let StmtKind::Expr(e) = &p.stmts[0].node else { panic!() };
        let ExprKind::Map(pairs) = &e.node else { panic!() };
        let keys: Vec<_> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "3"]);
    }

    #[test]
    fn compound_attr_assign_desugars() {
        let p = parse_ok("o.x += 1");
        let StmtKind::Expr(e) = &p.stmts[0].node else { panic!() };
        let ExprKind::AttrAssign { name, value, .. } = &e.node else { panic!() };
        assert_eq!(name, "x");
        assert!(matches!(
            value.node,
            ExprKind::Binary { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn increment_on_literal_is_a_parse_error() {
        let err = SyntaxAnalyzer::new("++5").analyze().unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn parse_errors_are_returned_not_fatal() {
        let err = SyntaxAnalyzer::new("let = 3").analyze().unwrap_err();
        assert!(err[0].detail.contains("identifier"));
    }

    #[test]
    fn include_both_forms() {
        let p = parse_ok("include \"mathlib\"\ninclude(\"strings\")");
        assert!(matches!(&p.stmts[0].node, StmtKind::Include(s) if s == "mathlib"));
        assert!(matches!(&p.stmts[1].node, StmtKind::Include(s) if s == "strings"));
    }

    #[test]
    fn statements_span_newlines_freely() {
        let p = parse_ok("let xs = [1,\n 2,\n 3]\nlet y = 4");
        assert_eq!(p.stmts.len(), 2);
    }
}
