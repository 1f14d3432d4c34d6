use super::Result;
use crate::foundation::OracleError;
use serde_json::Value;
use std::cmp::Ordering;

/// Deepest allowed nesting of `not` and parentheses.
pub const MAX_CONDITION_DEPTH: usize = 64;
/// Most `and`/`or` operators in one condition.
pub const MAX_CONDITION_OPERATORS: usize = 256;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Cmp(CmpOp),
    LParen,
    RParen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Operand {
    Number(f64),
    Str(String),
    Path(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Expr {
    Literal(bool),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Operand, CmpOp, Operand),
}

fn invalid(expression: &str, details: impl Into<String>) -> OracleError {
    OracleError::InvalidCondition { expression: expression.to_string(), details: details.into() }
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' => {
                let start = i + 1;
                let end = chars[start..].iter().position(|ch| *ch == '"').map(|off| start + off);
                let Some(end) = end else {
                    return Err(invalid(expression, "unterminated string"));
                };
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '=' | '!' | '<' | '>' => {
                let next_is_eq = chars.get(i + 1) == Some(&'=');
                let op = match (c, next_is_eq) {
                    ('=', true) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    ('<', true) => CmpOp::Le,
                    ('>', true) => CmpOp::Ge,
                    ('<', false) => CmpOp::Lt,
                    ('>', false) => CmpOp::Gt,
                    _ => return Err(invalid(expression, format!("unexpected '{}'", c))),
                };
                tokens.push(Token::Cmp(op));
                i += if next_is_eq { 2 } else { 1 };
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text.parse::<f64>().map_err(|_| invalid(expression, format!("bad number '{}'", text)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(expression, format!("unexpected '{}'", other))),
        }
    }
    Ok(tokens)
}

pub(super) struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(expression: &'a str) -> Result<Self> {
        Ok(Self { expression, tokens: tokenize(expression)?, pos: 0, depth: 0, operators: 0 })
    }

    pub(super) fn parse_all(mut self) -> Result<Expr> {
        if self.tokens.is_empty() {
            return Err(invalid(self.expression, "empty condition"));
        }
        let expr = self.parse_or()?;
        if self.pos != self.tokens.len() {
            return Err(invalid(self.expression, format!("trailing input at token {}", self.pos)));
        }
        Ok(expr)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // Bounds the recursion of the descent and of `Expr::eval` on the resulting tree.
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_CONDITION_DEPTH {
            return Err(invalid(self.expression, format!("nesting deeper than {}", MAX_CONDITION_DEPTH)));
        }
        Ok(())
    }

    fn count_operator(&mut self) -> Result<()> {
        self.operators += 1;
        if self.operators > MAX_CONDITION_OPERATORS {
            return Err(invalid(self.expression, format!("more than {} and/or operators", MAX_CONDITION_OPERATORS)));
        }
        self.pos += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.count_operator()?;
            left = Expr::Or(Box::new(left), Box::new(self.parse_and()?));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while self.peek_keyword("and") {
            self.count_operator()?;
            left = Expr::And(Box::new(left), Box::new(self.parse_unary()?));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek_keyword("not") {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if self.tokens.get(self.pos) == Some(&Token::LParen) {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_or()?;
            if self.next() != Some(Token::RParen) {
                return Err(invalid(self.expression, "missing ')'"));
            }
            self.depth -= 1;
            return Ok(inner);
        }
        if self.peek_keyword("true") && !self.followed_by_cmp() {
            self.pos += 1;
            return Ok(Expr::Literal(true));
        }
        if self.peek_keyword("false") && !self.followed_by_cmp() {
            self.pos += 1;
            return Ok(Expr::Literal(false));
        }
        let left = self.parse_operand()?;
        let op = match self.next() {
            Some(Token::Cmp(op)) => op,
            _ => return Err(invalid(self.expression, "expected comparison operator")),
        };
        let right = self.parse_operand()?;
        Ok(Expr::Compare(left, op, right))
    }

    fn followed_by_cmp(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1), Some(Token::Cmp(_)))
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Str(s)) => Ok(Operand::Str(s)),
            Some(Token::Ident(path)) => Ok(Operand::Path(path)),
            _ => Err(invalid(self.expression, "expected operand")),
        }
    }
}

fn resolve(expression: &str, operand: &Operand, context: &Value) -> Result<Value> {
    match operand {
        Operand::Number(n) => {
            serde_json::Number::from_f64(*n).map(Value::Number).ok_or_else(|| invalid(expression, "non-finite number"))
        }
        Operand::Str(s) => Ok(Value::String(s.clone())),
        Operand::Path(path) => {
            let mut current = context;
            for segment in path.split('.') {
                current = current.get(segment).ok_or_else(|| invalid(expression, format!("unknown field '{}'", path)))?;
            }
            Ok(current.clone())
        }
    }
}

fn compare(expression: &str, left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b).ok_or_else(|| invalid(expression, "incomparable numbers"))
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        _ => Err(invalid(expression, format!("cannot compare {} with {}", left, right))),
    }
}

impl Expr {
    pub(super) fn eval(&self, expression: &str, context: &Value) -> Result<bool> {
        Ok(match self {
            Expr::Literal(value) => *value,
            Expr::Not(inner) => !inner.eval(expression, context)?,
            Expr::And(a, b) => a.eval(expression, context)? && b.eval(expression, context)?,
            Expr::Or(a, b) => a.eval(expression, context)? || b.eval(expression, context)?,
            Expr::Compare(left, op, right) => {
                let ordering = compare(expression, &resolve(expression, left, context)?, &resolve(expression, right, context)?)?;
                match op {
                    CmpOp::Eq => ordering == Ordering::Equal,
                    CmpOp::Ne => ordering != Ordering::Equal,
                    CmpOp::Lt => ordering == Ordering::Less,
                    CmpOp::Le => ordering != Ordering::Greater,
                    CmpOp::Gt => ordering == Ordering::Greater,
                    CmpOp::Ge => ordering != Ordering::Less,
                }
            }
        })
    }
}
