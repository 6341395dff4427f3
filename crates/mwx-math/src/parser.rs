// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Expression Parser
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Parser and evaluator for the engine's math-expression grammar.
//!
//! Supported: numeric literals, variables `x y z t`, the constant `pi`,
//! `+ - * /`, powers `**` and `^` (right associative), comparisons
//! `< <= > >= == !=`, `and`/`or`, unary minus and `not`, the functions
//! `sin cos tan exp log sqrt abs floor ceil min max pow` and
//! `if(cond, a, b)`. Booleans evaluate to 1.0 / 0.0.

use std::f64::consts::PI;

use mwx_types::error::{MwxError, MwxResult};
use mwx_types::time::ExpressionEvaluator;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Var {
    X,
    Y,
    Z,
    T,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryFn {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
    Floor,
    Ceil,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryFn {
    Min,
    Max,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(Var),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call1(UnaryFn, Box<Expr>),
    Call2(BinaryFn, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Values bound to the free variables during evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vars {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub t: f64,
}

impl Vars {
    pub fn at_time(t: f64) -> Self {
        Vars { t, ..Vars::default() }
    }
}

fn truth(v: bool) -> f64 {
    if v {
        1.0
    } else {
        0.0
    }
}

impl Expr {
    pub fn parse(src: &str) -> MwxResult<Expr> {
        let tokens = tokenize(src)?;
        let mut p = Parser {
            src,
            tokens,
            pos: 0,
        };
        let expr = p.parse_expr(0)?;
        if let Some(tok) = p.peek() {
            return Err(MwxError::Expression(format!(
                "Unexpected token {tok:?} in '{src}'"
            )));
        }
        Ok(expr)
    }

    pub fn eval(&self, vars: &Vars) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Var(Var::X) => vars.x,
            Expr::Var(Var::Y) => vars.y,
            Expr::Var(Var::Z) => vars.z,
            Expr::Var(Var::T) => vars.t,
            Expr::Neg(a) => -a.eval(vars),
            Expr::Not(a) => truth(a.eval(vars) == 0.0),
            Expr::Binary(op, a, b) => {
                let (a, b) = (a.eval(vars), b.eval(vars));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                    BinOp::Lt => truth(a < b),
                    BinOp::Le => truth(a <= b),
                    BinOp::Gt => truth(a > b),
                    BinOp::Ge => truth(a >= b),
                    BinOp::Eq => truth(a == b),
                    BinOp::Ne => truth(a != b),
                    BinOp::And => truth(a != 0.0 && b != 0.0),
                    BinOp::Or => truth(a != 0.0 || b != 0.0),
                }
            }
            Expr::Call1(f, a) => {
                let a = a.eval(vars);
                match f {
                    UnaryFn::Sin => a.sin(),
                    UnaryFn::Cos => a.cos(),
                    UnaryFn::Tan => a.tan(),
                    UnaryFn::Exp => a.exp(),
                    UnaryFn::Log => a.ln(),
                    UnaryFn::Sqrt => a.sqrt(),
                    UnaryFn::Abs => a.abs(),
                    UnaryFn::Floor => a.floor(),
                    UnaryFn::Ceil => a.ceil(),
                }
            }
            Expr::Call2(f, a, b) => {
                let (a, b) = (a.eval(vars), b.eval(vars));
                match f {
                    BinaryFn::Min => a.min(b),
                    BinaryFn::Max => a.max(b),
                    BinaryFn::Pow => a.powf(b),
                }
            }
            Expr::If(c, a, b) => {
                if c.eval(vars) != 0.0 {
                    a.eval(vars)
                } else {
                    b.eval(vars)
                }
            }
        }
    }

    pub fn eval_at(&self, x: f64, y: f64, z: f64, t: f64) -> f64 {
        self.eval(&Vars { x, y, z, t })
    }

    /// True if the expression references `t`.
    pub fn depends_on_time(&self) -> bool {
        match self {
            Expr::Num(_) => false,
            Expr::Var(v) => *v == Var::T,
            Expr::Neg(a) | Expr::Not(a) | Expr::Call1(_, a) => a.depends_on_time(),
            Expr::Binary(_, a, b) | Expr::Call2(_, a, b) => {
                a.depends_on_time() || b.depends_on_time()
            }
            Expr::If(c, a, b) => {
                c.depends_on_time() || a.depends_on_time() || b.depends_on_time()
            }
        }
    }
}

// ── Tokenizer ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> MwxResult<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| {
                MwxError::Expression(format!("Invalid number '{text}' in '{src}'"))
            })?;
            tokens.push(Token::Num(value));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }
        let next = chars.get(i + 1).copied();
        let (tok, width) = match (c, next) {
            ('*', Some('*')) => (Token::Op("^"), 2),
            ('<', Some('=')) => (Token::Op("<="), 2),
            ('>', Some('=')) => (Token::Op(">="), 2),
            ('=', Some('=')) => (Token::Op("=="), 2),
            ('!', Some('=')) => (Token::Op("!="), 2),
            ('&', Some('&')) => (Token::Op("and"), 2),
            ('|', Some('|')) => (Token::Op("or"), 2),
            ('+', _) => (Token::Op("+"), 1),
            ('-', _) => (Token::Op("-"), 1),
            ('*', _) => (Token::Op("*"), 1),
            ('/', _) => (Token::Op("/"), 1),
            ('^', _) => (Token::Op("^"), 1),
            ('<', _) => (Token::Op("<"), 1),
            ('>', _) => (Token::Op(">"), 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => {
                return Err(MwxError::Expression(format!(
                    "Unexpected character '{c}' in '{src}'"
                )))
            }
        };
        tokens.push(tok);
        i += width;
    }
    Ok(tokens)
}

// ── Pratt parser ─────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_CMP: u8 = 3;
const PREC_ADD: u8 = 4;
const PREC_MUL: u8 = 5;
const PREC_UNARY: u8 = 6;
const PREC_POW: u8 = 7;

fn infix(tok: &Token) -> Option<(BinOp, u8)> {
    let op = match tok {
        Token::Op(op) => *op,
        Token::Ident(name) if name == "and" => "and",
        Token::Ident(name) if name == "or" => "or",
        _ => return None,
    };
    let entry = match op {
        "or" => (BinOp::Or, PREC_OR),
        "and" => (BinOp::And, PREC_AND),
        "<" => (BinOp::Lt, PREC_CMP),
        "<=" => (BinOp::Le, PREC_CMP),
        ">" => (BinOp::Gt, PREC_CMP),
        ">=" => (BinOp::Ge, PREC_CMP),
        "==" => (BinOp::Eq, PREC_CMP),
        "!=" => (BinOp::Ne, PREC_CMP),
        "+" => (BinOp::Add, PREC_ADD),
        "-" => (BinOp::Sub, PREC_ADD),
        "*" => (BinOp::Mul, PREC_MUL),
        "/" => (BinOp::Div, PREC_MUL),
        "^" => (BinOp::Pow, PREC_POW),
        _ => return None,
    };
    Some(entry)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn err(&self, msg: &str) -> MwxError {
        MwxError::Expression(format!("{msg} in '{}'", self.src))
    }

    fn expect(&mut self, want: Token) -> MwxResult<()> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(self.err(&format!("Expected {want:?}, found {tok:?}"))),
            None => Err(self.err(&format!("Expected {want:?}, found end of input"))),
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> MwxResult<Expr> {
        let mut lhs = self.parse_prefix()?;
        while let Some((op, prec)) = self.peek().and_then(infix) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            // powers are right associative
            let next_min = if op == BinOp::Pow { prec } else { prec + 1 };
            let rhs = self.parse_expr(next_min)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> MwxResult<Expr> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Op("-")) => Ok(Expr::Neg(Box::new(self.parse_expr(PREC_UNARY)?))),
            Some(Token::Op("+")) => self.parse_expr(PREC_UNARY),
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.parse_ident(&name),
            Some(tok) => Err(self.err(&format!("Unexpected token {tok:?}"))),
            None => Err(self.err("Unexpected end of input")),
        }
    }

    fn parse_ident(&mut self, name: &str) -> MwxResult<Expr> {
        match name {
            "x" => return Ok(Expr::Var(Var::X)),
            "y" => return Ok(Expr::Var(Var::Y)),
            "z" => return Ok(Expr::Var(Var::Z)),
            "t" => return Ok(Expr::Var(Var::T)),
            "pi" => return Ok(Expr::Num(PI)),
            "not" => return Ok(Expr::Not(Box::new(self.parse_expr(PREC_UNARY)?))),
            _ => {}
        }

        let unary = match name {
            "sin" => Some(UnaryFn::Sin),
            "cos" => Some(UnaryFn::Cos),
            "tan" => Some(UnaryFn::Tan),
            "exp" => Some(UnaryFn::Exp),
            "log" => Some(UnaryFn::Log),
            "sqrt" => Some(UnaryFn::Sqrt),
            "abs" => Some(UnaryFn::Abs),
            "floor" => Some(UnaryFn::Floor),
            "ceil" => Some(UnaryFn::Ceil),
            _ => None,
        };
        let binary = match name {
            "min" => Some(BinaryFn::Min),
            "max" => Some(BinaryFn::Max),
            "pow" => Some(BinaryFn::Pow),
            _ => None,
        };
        if unary.is_none() && binary.is_none() && name != "if" {
            return Err(self.err(&format!("Unknown identifier '{name}'")));
        }

        self.expect(Token::LParen)?;
        let mut args = vec![self.parse_expr(0)?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.parse_expr(0)?);
        }
        self.expect(Token::RParen)?;

        let arity = if name == "if" {
            3
        } else if unary.is_some() {
            1
        } else {
            2
        };
        if args.len() != arity {
            return Err(self.err(&format!(
                "Function '{name}' takes {arity} argument(s), got {}",
                args.len()
            )));
        }

        let mut args = args.into_iter().map(Box::new);
        let mut arg = || args.next().ok_or_else(|| self.err("Missing argument"));
        if let Some(f) = unary {
            return Ok(Expr::Call1(f, arg()?));
        }
        if let Some(f) = binary {
            let a = arg()?;
            let b = arg()?;
            return Ok(Expr::Call2(f, a, b));
        }
        let c = arg()?;
        let a = arg()?;
        let b = arg()?;
        Ok(Expr::If(c, a, b))
    }
}

/// Built-in [`ExpressionEvaluator`]: spatial variables are bound to zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserEvaluator;

impl ExpressionEvaluator for ParserEvaluator {
    fn eval_expression_t(&self, expr: &str, t: f64) -> MwxResult<f64> {
        let parsed = Expr::parse(expr)?;
        let value = parsed.eval(&Vars::at_time(t));
        if value.is_nan() {
            return Err(MwxError::Expression(format!(
                "'{expr}' evaluated to NaN at t={t}"
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> f64 {
        Expr::parse(src).unwrap().eval(&Vars::default())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1+2*3"), 7.0);
        assert_eq!(eval("(1+2)*3"), 9.0);
        assert_eq!(eval("2**3**2"), 512.0);
        assert_eq!(eval("-2**2"), -4.0);
        assert_eq!(eval("2^-1"), 0.5);
        assert_eq!(eval("10-4-3"), 3.0);
    }

    #[test]
    fn test_scientific_literals() {
        assert!((eval("1e-6*2") - 2e-6).abs() < 1e-20);
        assert_eq!(eval("1.5E+3"), 1500.0);
        assert_eq!(eval(".5"), 0.5);
    }

    #[test]
    fn test_functions_and_conditionals() {
        assert_eq!(eval("max(max(1,5),3)"), 5.0);
        assert_eq!(eval("min(2,-3)"), -3.0);
        assert_eq!(eval("pow(2,10)"), 1024.0);
        assert_eq!(eval("abs(-4)"), 4.0);
        assert_eq!(eval("if(1>2, 7, 9)"), 9.0);
        assert_eq!(eval("if(1<2 and 3>2, 7, 9)"), 7.0);
        assert_eq!(eval("if(1>2 or 0, 7, 9)"), 9.0);
        assert_eq!(eval("not 0"), 1.0);
        assert!((eval("sin(pi/2)") - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_variables() {
        let e = Expr::parse("-((x-1)**2+(z-2)**2-0.25)").unwrap();
        assert!((e.eval_at(1.0, 0.0, 2.0, 0.0) - 0.25).abs() < 1e-15);
        assert!(e.eval_at(3.0, 0.0, 2.0, 0.0) < 0.0);
        assert!(!e.depends_on_time());
        assert!(Expr::parse("3*t").unwrap().depends_on_time());
    }

    #[test]
    fn test_errors_name_the_source() {
        let err = Expr::parse("foo(1)").unwrap_err();
        assert!(err.to_string().contains("foo"));
        assert!(Expr::parse("1+").is_err());
        assert!(Expr::parse("max(1)").is_err());
        assert!(Expr::parse("(1+2").is_err());
        assert!(Expr::parse("1 2").is_err());
        assert!(Expr::parse("2 $ 3").is_err());
    }

    #[test]
    fn test_evaluator_binds_time() {
        let ev = ParserEvaluator;
        let v = ev.eval_expression_t("450.0*sin(2*pi*t)", 0.25).unwrap();
        assert!((v - 450.0).abs() < 1e-9);
        assert!(ev.eval_expression_t("sqrt(-1)", 0.0).is_err());
    }
}
