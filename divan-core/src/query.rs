//! Filter expressions over top-level document fields.
//!
//! The store has no query language beyond key lookup. Filters exist so the registry can select
//! its `type = "collection"` descriptors, and they are limited to what a relational engine's
//! "get top-level field" operator can express: equality on a top-level field, combined with AND.
//!
//! Backends either evaluate an [`Expr`] directly ([`Expr::matches`]) or translate it with a
//! [`QueryVisitor`].
//!
//! # Example
//!
//! ```ignore
//! use divan_core::query::Filter;
//!
//! let expr = Filter::eq("type", "collection").and(Filter::eq("name", "users"));
//! ```

use serde_json::{Map, Value};

/// A filter expression over the top-level fields of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All sub-expressions must match.
    And(Vec<Expr>),
    /// The top-level `field` must equal `value`.
    Eq { field: String, value: Value },
}

impl Expr {
    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended to it.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Evaluates this expression against a document body.
    pub fn matches(&self, document: &Map<String, Value>) -> bool {
        match self {
            Expr::And(exprs) => exprs.iter().all(|expr| expr.matches(document)),
            Expr::Eq { field, value } => document.get(field) == Some(value),
        }
    }
}

/// Helper for constructing filter expressions.
pub struct Filter;

impl Filter {
    /// Matches documents whose top-level `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::Eq { field: field.into(), value: value.into() }
    }
}

/// Visitor over filter expressions, used by backends to translate them into native syntax.
pub trait QueryVisitor {
    type Output;
    type Error;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Eq { field, value } => self.visit_eq(field, value),
        }
    }

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;

    fn visit_eq(&mut self, field: &str, value: &Value) -> Result<Self::Output, Self::Error>;
}
