//! Parsing and evaluation of user-authored scalar expressions.
//!
//! Expressions are parsed into a small syntax tree ([`Expr`]) and evaluated
//! against a set of [`Bindings`]. Nothing is ever handed to a general-purpose
//! interpreter, so the accepted language is exactly the grammar below.
//!
//! ```text
//! expr    = term (('+' | '-') term)*
//! term    = unary (('*' | '/') unary)*
//! unary   = ('-' | '+') unary | power
//! power   = primary ('^' unary)?
//! primary = number | name | function '(' expr ')' | '(' expr ')'
//! ```
//!
//! `^` is right-associative and binds tighter than unary minus, so `-x^2` is
//! `-(x^2)` and `2^3^2` is `2^9`. The available functions are `sin`, `cos`,
//! `tan`, `sinh`, `cosh`, `tanh`, `exp`, `sqrt`, `abs`, `log` and `ln` (`log`
//! and `ln` are both the natural logarithm). The names `pi` and `e` are the
//! usual constants; `x` and `t` are free variables that must be supplied by the
//! caller along with any parameters. For compatibility with older expression
//! strings, a bare `i` evaluates to 1: there is no complex arithmetic here.
//!
//! ```
//! use std::collections::HashMap;
//! use tdse::expr::{ evaluate, Scope };
//!
//! let params: HashMap<String, f64>
//!     = [("A".to_string(), 2.0), ("k".to_string(), 0.5)].into_iter().collect();
//! let scope = Scope::new(&params).with_x(std::f64::consts::PI);
//! let v = evaluate("A * sin(k * x)^2", &scope).unwrap();
//! assert!((v - 2.0).abs() < 1e-12);
//! ```

use std::{
    collections::{ BTreeMap, HashMap },
    f64::consts::{ E, PI },
    hash::BuildHasher,
};
use crate::error::EvalError;

pub type EvalResult<T> = Result<T, EvalError>;

/// Names of all callable functions.
pub const FUNCTIONS: [&str; 11] = [
    "sin", "cos", "tan", "sinh", "cosh", "tanh", "exp", "sqrt", "abs", "log",
    "ln",
];

/// Every identifier that can never name a parameter.
pub const RESERVED: [&str; 20] = [
    "x", "t", "i", "pi", "e",
    "sin", "cos", "tan", "sinh", "cosh", "tanh", "exp", "sqrt", "abs", "log",
    "ln",
    "true", "false", "if", "else",
];

/// Deepest nesting the parser accepts. Parentheses, calls, signs, powers, and
/// each link in a chain of binary operators all count one level.
pub const MAX_DEPTH: usize = 256;

/// Return `true` if `name` is a variable, constant, function, or keyword.
pub fn is_reserved(name: &str) -> bool { RESERVED.contains(&name) }

/// Source of values for the free identifiers in an expression.
pub trait Bindings {
    /// Look up the value bound to `name`, if any.
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl<S: BuildHasher> Bindings for HashMap<String, f64, S> {
    fn lookup(&self, name: &str) -> Option<f64> { self.get(name).copied() }
}

impl<'a, S: BuildHasher> Bindings for HashMap<&'a str, f64, S> {
    fn lookup(&self, name: &str) -> Option<f64> { self.get(name).copied() }
}

impl Bindings for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> { self.get(name).copied() }
}

impl<'a> Bindings for [(&'a str, f64)] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

impl<'a, const N: usize> Bindings for [(&'a str, f64); N] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.as_slice().lookup(name)
    }
}

/// Layers the free variables `x` and `t` over a set of parameter bindings.
///
/// This is how grid generators evaluate one expression at many points without
/// copying the parameter map for each one.
#[derive(Debug)]
pub struct Scope<'a, B: ?Sized> {
    params: &'a B,
    x: Option<f64>,
    t: Option<f64>,
}

impl<'a, B: ?Sized> Clone for Scope<'a, B> {
    fn clone(&self) -> Self { *self }
}

impl<'a, B: ?Sized> Copy for Scope<'a, B> { }

impl<'a, B> Scope<'a, B>
where B: Bindings + ?Sized
{
    /// Create a new scope with neither `x` nor `t` bound.
    pub fn new(params: &'a B) -> Self { Self { params, x: None, t: None } }

    /// Bind `x`.
    pub fn with_x(mut self, x: f64) -> Self { self.x = Some(x); self }

    /// Bind `t`.
    pub fn with_t(mut self, t: f64) -> Self { self.t = Some(t); self }
}

impl<'a, B> Bindings for Scope<'a, B>
where B: Bindings + ?Sized
{
    fn lookup(&self, name: &str) -> Option<f64> {
        match name {
            "x" => self.x,
            "t" => self.t,
            _ => self.params.lookup(name),
        }
    }
}

/// A unary function callable from an expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Sqrt,
    Abs,
    /// Natural logarithm.
    Log,
    /// Natural logarithm.
    Ln,
}

impl Func {
    /// Look up a function by its name in the expression language.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "sinh" => Some(Self::Sinh),
            "cosh" => Some(Self::Cosh),
            "tanh" => Some(Self::Tanh),
            "exp" => Some(Self::Exp),
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            "log" => Some(Self::Log),
            "ln" => Some(Self::Ln),
            _ => None,
        }
    }

    pub fn apply(self, a: f64) -> f64 {
        match self {
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::Sinh => a.sinh(),
            Self::Cosh => a.cosh(),
            Self::Tanh => a.tanh(),
            Self::Exp => a.exp(),
            Self::Sqrt => a.sqrt(),
            Self::Abs => a.abs(),
            Self::Log | Self::Ln => a.ln(),
        }
    }
}

/// A binary arithmetic operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
        }
    }
}

/// Syntax tree of a parsed expression.
///
/// Constants (`pi`, `e`, and the legacy `i`) are folded into
/// [`Number`][Expr::Number]s at parse time; every other name becomes a
/// [`Variable`][Expr::Variable] resolved at evaluation time.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { func: Func, arg: Box<Expr> },
}

impl Expr {
    /// Parse an expression.
    pub fn parse(src: &str) -> EvalResult<Self> {
        let tokens = lex(src)?;
        if tokens.is_empty() { return Err(EvalError::Empty); }
        let mut parser = Parser { tokens, pos: 0, depth: 0 };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(tok.unexpected()),
        }
    }

    /// Evaluate against a set of bindings.
    ///
    /// Fails if a variable is unbound or the result is not finite.
    pub fn eval<B>(&self, bindings: &B) -> EvalResult<f64>
    where B: Bindings + ?Sized
    {
        let value = self.eval_raw(bindings)?;
        value.is_finite().then_some(value).ok_or(EvalError::NonFinite(value))
    }

    fn eval_raw<B>(&self, bindings: &B) -> EvalResult<f64>
    where B: Bindings + ?Sized
    {
        match self {
            Self::Number(v) => Ok(*v),
            Self::Variable(name) => {
                bindings.lookup(name)
                    .ok_or_else(|| EvalError::Unbound(name.clone()))
            },
            Self::Neg(a) => Ok(-a.eval_raw(bindings)?),
            Self::Binary { op, lhs, rhs } => {
                let a = lhs.eval_raw(bindings)?;
                let b = rhs.eval_raw(bindings)?;
                Ok(op.apply(a, b))
            },
            Self::Call { func, arg } => Ok(func.apply(arg.eval_raw(bindings)?)),
        }
    }
}

/// Parse and evaluate an expression in one go.
///
/// Prefer [`Expr::parse`] followed by repeated [`Expr::eval`] when the same
/// expression is evaluated at many points.
pub fn evaluate<B>(expression: &str, bindings: &B) -> EvalResult<f64>
where B: Bindings + ?Sized
{
    Expr::parse(expression)?.eval(bindings)
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

#[derive(Clone, Debug, PartialEq)]
struct Token {
    tok: Tok,
    pos: usize,
}

impl Token {
    fn unexpected(&self) -> EvalError {
        let found
            = match &self.tok {
                Tok::Num(v) => format!("number {}", v),
                Tok::Ident(name) => format!("identifier {:?}", name),
                Tok::Plus => "'+'".to_string(),
                Tok::Minus => "'-'".to_string(),
                Tok::Star => "'*'".to_string(),
                Tok::Slash => "'/'".to_string(),
                Tok::Caret => "'^'".to_string(),
                Tok::LParen => "'('".to_string(),
                Tok::RParen => "')'".to_string(),
            };
        EvalError::UnexpectedToken { found, pos: self.pos }
    }
}

// true if the exponent of a numeric literal starts at `i`, i.e. `e` or `E`
// followed by digits, optionally signed
fn exponent_at(chars: &[char], i: usize) -> bool {
    let digit_at = |j: usize| chars.get(j).is_some_and(|c| c.is_ascii_digit());
    match chars.get(i) {
        Some('e' | 'E') => match chars.get(i + 1) {
            Some('+' | '-') => digit_at(i + 2),
            _ => digit_at(i + 1),
        },
        _ => false,
    }
}

fn lex(src: &str) -> EvalResult<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i: usize = 0;
    while let Some(&c) = chars.get(i) {
        let start = i;
        let tok
            = match c {
                c if c.is_whitespace() => { i += 1; continue; },
                '+' => { i += 1; Tok::Plus },
                '-' => { i += 1; Tok::Minus },
                '*' => { i += 1; Tok::Star },
                '/' => { i += 1; Tok::Slash },
                '^' => { i += 1; Tok::Caret },
                '(' => { i += 1; Tok::LParen },
                ')' => { i += 1; Tok::RParen },
                c if c.is_ascii_digit()
                    || (c == '.'
                        && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
                => {
                    while chars.get(i).is_some_and(|d| d.is_ascii_digit()) {
                        i += 1;
                    }
                    if chars.get(i) == Some(&'.') {
                        i += 1;
                        while chars.get(i).is_some_and(|d| d.is_ascii_digit()) {
                            i += 1;
                        }
                    }
                    if exponent_at(&chars, i) {
                        i += 2;
                        while chars.get(i).is_some_and(|d| d.is_ascii_digit()) {
                            i += 1;
                        }
                    }
                    let lit: String = chars[start..i].iter().collect();
                    let v: f64
                        = lit.parse()
                        .map_err(|_| EvalError::UnexpectedToken {
                            found: format!("literal {:?}", lit),
                            pos: start,
                        })?;
                    Tok::Num(v)
                },
                c if c.is_ascii_alphabetic() => {
                    while chars.get(i).is_some_and(|d| d.is_ascii_alphanumeric()) {
                        i += 1;
                    }
                    Tok::Ident(chars[start..i].iter().collect())
                },
                ch => { return Err(EvalError::InvalidCharacter { ch, pos: i }); },
            };
        tokens.push(Token { tok, pos: start });
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> { self.tokens.get(self.pos) }

    fn peek_tok(&self) -> Option<&Tok> { self.peek().map(|t| &t.tok) }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() { self.pos += 1; }
        tok
    }

    fn expect_rparen(&mut self) -> EvalResult<()> {
        match self.next() {
            Some(Token { tok: Tok::RParen, .. }) => Ok(()),
            Some(tok) => Err(tok.unexpected()),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    // go one level deeper; callers restore `depth` on the way out
    fn descend(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(EvalError::TooDeep(MAX_DEPTH))
        } else {
            Ok(())
        }
    }

    fn expr(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.term()?;
        loop {
            let op
                = match self.peek_tok() {
                    Some(Tok::Plus) => BinOp::Add,
                    Some(Tok::Minus) => BinOp::Sub,
                    _ => break,
                };
            self.pos += 1;
            self.descend()?;
            let rhs = self.term()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn term(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op
                = match self.peek_tok() {
                    Some(Tok::Star) => BinOp::Mul,
                    Some(Tok::Slash) => BinOp::Div,
                    _ => break,
                };
            self.pos += 1;
            self.descend()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn unary(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let expr
            = match self.peek_tok() {
                Some(Tok::Minus) => {
                    self.pos += 1;
                    self.descend()?;
                    Expr::Neg(Box::new(self.unary()?))
                },
                Some(Tok::Plus) => {
                    self.pos += 1;
                    self.descend()?;
                    self.unary()?
                },
                _ => self.power()?,
            };
        self.depth = depth;
        Ok(expr)
    }

    fn power(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let base = self.primary()?;
        if let Some(Tok::Caret) = self.peek_tok() {
            self.pos += 1;
            self.descend()?;
            let exponent = self.unary()?;
            self.depth = depth;
            Ok(Expr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            })
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> EvalResult<Expr> {
        let depth = self.depth;
        let token = self.next().ok_or(EvalError::UnexpectedEnd)?;
        match token.tok {
            Tok::Num(v) => Ok(Expr::Number(v)),
            Tok::LParen => {
                self.descend()?;
                let inner = self.expr()?;
                self.expect_rparen()?;
                self.depth = depth;
                Ok(inner)
            },
            Tok::Ident(name) => {
                if let Some(Tok::LParen) = self.peek_tok() {
                    let func
                        = Func::from_name(&name)
                        .ok_or(EvalError::UnknownFunction(name))?;
                    self.pos += 1;
                    self.descend()?;
                    let arg = self.expr()?;
                    self.expect_rparen()?;
                    self.depth = depth;
                    return Ok(Expr::Call { func, arg: Box::new(arg) });
                }
                if Func::from_name(&name).is_some() {
                    return Err(EvalError::MissingCall(name));
                }
                match name.as_str() {
                    "pi" => Ok(Expr::Number(PI)),
                    "e" => Ok(Expr::Number(E)),
                    "i" => Ok(Expr::Number(1.0)),
                    _ => Ok(Expr::Variable(name)),
                }
            },
            _ => Err(token.unexpected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use super::*;

    fn eval_x(src: &str, x: f64) -> EvalResult<f64> {
        evaluate(src, &[("x", x)])
    }

    #[test]
    fn precedence_and_associativity() {
        assert_relative_eq!(eval_x("1 + 2 * 3", 0.0).unwrap(), 7.0);
        assert_relative_eq!(eval_x("(1 + 2) * 3", 0.0).unwrap(), 9.0);
        assert_relative_eq!(eval_x("8 / 4 / 2", 0.0).unwrap(), 1.0);
        assert_relative_eq!(eval_x("2^3^2", 0.0).unwrap(), 512.0);
        assert_relative_eq!(eval_x("-x^2", 3.0).unwrap(), -9.0);
        assert_relative_eq!(eval_x("2^-1", 0.0).unwrap(), 0.5);
        assert_relative_eq!(eval_x("--x", 2.0).unwrap(), 2.0);
        assert_relative_eq!(eval_x("0.5*x^2", 2.0).unwrap(), 2.0);
    }

    #[test]
    fn functions_and_constants() {
        assert_relative_eq!(eval_x("sin(pi/2)", 0.0).unwrap(), 1.0);
        assert_relative_eq!(eval_x("ln(e)", 0.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(eval_x("log(e^2)", 0.0).unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(eval_x("sqrt(abs(x))", -16.0).unwrap(), 4.0);
        assert_relative_eq!(
            eval_x("cosh(x)^2 - sinh(x)^2", 1.3).unwrap(), 1.0,
            epsilon = 1e-12,
        );
        assert_relative_eq!(eval_x("tanh(0) + tan(0) + cos(0)", 0.0).unwrap(), 1.0);
        assert_relative_eq!(eval_x("exp(-x^2)", 0.0).unwrap(), 1.0);
    }

    #[test]
    fn numeric_literals() {
        assert_relative_eq!(eval_x("1e-3 * x", 2.0).unwrap(), 2e-3);
        assert_relative_eq!(eval_x(".5 + 2.", 0.0).unwrap(), 2.5);
        assert_relative_eq!(eval_x("2.5E+1", 0.0).unwrap(), 25.0);
        // `2e` is a number followed by the constant, which is not implicit
        // multiplication
        assert!(matches!(
            eval_x("2e", 0.0),
            Err(EvalError::UnexpectedToken { .. })
        ));
        assert_relative_eq!(eval_x("2*e", 0.0).unwrap(), 2.0 * E);
    }

    #[test]
    fn whole_word_parameters() {
        let params: HashMap<String, f64>
            = [("k".to_string(), 2.0), ("k0".to_string(), 10.0)]
            .into_iter().collect();
        let scope = Scope::new(&params).with_x(9.0);
        assert_relative_eq!(evaluate("k0 + k", &scope).unwrap(), 12.0);
        assert_relative_eq!(evaluate("sqrt(x) * k", &scope).unwrap(), 6.0);
    }

    #[test]
    fn scope_layers_free_variables() {
        let params: BTreeMap<String, f64>
            = [("w".to_string(), 3.0)].into_iter().collect();
        let scope = Scope::new(&params).with_x(2.0).with_t(0.5);
        assert_relative_eq!(evaluate("w * x + t", &scope).unwrap(), 6.5);
        assert_eq!(
            evaluate("t", &Scope::new(&params).with_x(1.0)),
            Err(EvalError::Unbound("t".to_string())),
        );
    }

    #[test]
    fn legacy_imaginary_unit_is_one() {
        assert_relative_eq!(eval_x("exp(i*x)", 1.0).unwrap(), E, epsilon = 1e-12);
    }

    #[test]
    fn failures() {
        assert_eq!(eval_x("", 0.0), Err(EvalError::Empty));
        assert_eq!(eval_x("   ", 0.0), Err(EvalError::Empty));
        assert_eq!(
            eval_x("x; 1", 0.0),
            Err(EvalError::InvalidCharacter { ch: ';', pos: 1 }),
        );
        assert_eq!(
            eval_x("x**2", 0.0),
            Err(EvalError::UnexpectedToken { found: "'*'".to_string(), pos: 2 }),
        );
        assert_eq!(eval_x("(x + 1", 0.0), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval_x("x +", 0.0), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval_x("a * x", 0.0), Err(EvalError::Unbound("a".to_string())));
        assert_eq!(
            eval_x("foo(x)", 0.0),
            Err(EvalError::UnknownFunction("foo".to_string())),
        );
        assert_eq!(eval_x("sin * x", 0.0), Err(EvalError::MissingCall("sin".to_string())));
        assert!(matches!(eval_x("1 / x", 0.0), Err(EvalError::NonFinite(_))));
        assert!(matches!(eval_x("log(x)", 0.0), Err(EvalError::NonFinite(_))));
        assert!(matches!(eval_x("sqrt(x)", -1.0), Err(EvalError::NonFinite(_))));
        assert!(matches!(eval_x("x_1", 0.0), Err(EvalError::InvalidCharacter { ch: '_', .. })));
    }

    #[test]
    fn nesting_is_limited() {
        let nested = |n: usize| format!("{}x{}", "(".repeat(n), ")".repeat(n));
        assert_relative_eq!(eval_x(&nested(100), 2.0).unwrap(), 2.0);
        assert_eq!(
            eval_x(&nested(20_000), 2.0),
            Err(EvalError::TooDeep(MAX_DEPTH)),
        );
        let signs = format!("{}x", "-".repeat(20_000));
        assert_eq!(eval_x(&signs, 2.0), Err(EvalError::TooDeep(MAX_DEPTH)));
        let calls = format!("{}x{}", "abs(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(eval_x(&calls, 2.0), Err(EvalError::TooDeep(MAX_DEPTH)));
        let powers = format!("1{}", "^1".repeat(20_000));
        assert_eq!(eval_x(&powers, 2.0), Err(EvalError::TooDeep(MAX_DEPTH)));
        let sum = format!("x{}", "+x".repeat(20_000));
        assert_eq!(eval_x(&sum, 2.0), Err(EvalError::TooDeep(MAX_DEPTH)));
        assert_relative_eq!(eval_x(&format!("x{}", "+x".repeat(99)), 2.0).unwrap(), 200.0);
    }

    #[test]
    fn parse_once_eval_many() {
        let expr = Expr::parse("x^2").unwrap();
        let total: f64
            = (0..4).map(|k| expr.eval(&[("x", k as f64)]).unwrap()).sum();
        assert_relative_eq!(total, 14.0);
    }
}
