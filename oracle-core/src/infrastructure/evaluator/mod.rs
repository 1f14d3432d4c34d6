//! Boolean condition language for conditioned transactions.
//!
//! Grammar: `expr := and ("or" and)*`, `and := unary ("and" unary)*`,
//! `unary := "not" unary | "(" expr ")" | True | False | operand cmp operand`.
//! Operands are numbers, double-quoted strings, or dotted paths resolved against the context.

mod parser;

use crate::foundation::OracleError;
use parser::{Expr, Parser};
pub use parser::{MAX_CONDITION_DEPTH, MAX_CONDITION_OPERATORS};
use serde_json::Value;

pub type Result<T> = std::result::Result<T, OracleError>;

pub trait ConditionEvaluator: Send + Sync {
    /// Syntax check only; used when a request arrives.
    fn validate(&self, expression: &str) -> Result<()>;
    fn evaluate(&self, expression: &str, context: &Value) -> Result<bool>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BasicEvaluator;

impl BasicEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn parse(expression: &str) -> Result<Expr> {
        Parser::new(expression)?.parse_all()
    }
}

impl ConditionEvaluator for BasicEvaluator {
    fn validate(&self, expression: &str) -> Result<()> {
        Self::parse(expression).map(|_| ())
    }

    fn evaluate(&self, expression: &str, context: &Value) -> Result<bool> {
        Self::parse(expression)?.eval(expression, context)
    }
}
