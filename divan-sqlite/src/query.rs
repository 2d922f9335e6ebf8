//! Filter translation from divan expressions to SQL.
//!
//! Expressions become a `WHERE` fragment over the document column using SQLite's `->>`
//! ("get top-level field as SQL value") and `->` ("get top-level field as JSON") operators.
//! Field labels and comparison values are always bound as parameters.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use divan_core::{
    error::DivanError,
    query::{Expr, QueryVisitor},
};

/// A SQL boolean expression and the parameters it binds, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlFilter {
    pub(crate) clause: String,
    pub(crate) params: Vec<SqlValue>,
}

/// Translates divan filter expressions into [`SqlFilter`]s over one document column.
pub(crate) struct SqlQueryTranslator<'a> {
    /// Quoted name of the document column.
    column: &'a str,
}

impl<'a> SqlQueryTranslator<'a> {
    pub(crate) fn new(column: &'a str) -> Self {
        Self { column }
    }
}

impl QueryVisitor for SqlQueryTranslator<'_> {
    type Output = SqlFilter;
    type Error = DivanError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(SqlFilter { clause: "1 = 1".into(), params: vec![] });
        }

        let parts = exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SqlFilter {
            clause: parts
                .iter()
                .map(|part| format!("({})", part.clause))
                .collect::<Vec<_>>()
                .join(" AND "),
            params: parts
                .into_iter()
                .flat_map(|part| part.params)
                .collect(),
        })
    }

    fn visit_eq(&mut self, field: &str, value: &Value) -> Result<Self::Output, Self::Error> {
        let label = SqlValue::Text(field.to_string());
        let column = self.column;
        let path = "('$.' || json_quote(?))";

        Ok(match value {
            Value::Null => SqlFilter {
                clause: format!("json_type({column}, {path}) = 'null'"),
                params: vec![label],
            },
            Value::Bool(b) => SqlFilter {
                clause: format!("{column} -> {path} = ?"),
                params: vec![label, SqlValue::Text(b.to_string())],
            },
            Value::String(s) => SqlFilter {
                clause: format!("json_type({column}, {path}) = 'text' AND {column} ->> {path} = ?"),
                params: vec![label.clone(), label, SqlValue::Text(s.clone())],
            },
            Value::Number(n) => {
                let number = match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => SqlValue::Integer(i),
                    (None, Some(f)) => SqlValue::Real(f),
                    (None, None) => {
                        return Err(DivanError::InvalidDocument(format!("unsupported number in filter: {n}")));
                    }
                };
                SqlFilter {
                    clause: format!(
                        "json_type({column}, {path}) IN ('integer', 'real') AND {column} ->> {path} = ?"
                    ),
                    params: vec![label.clone(), label, number],
                }
            }
            Value::Array(_) | Value::Object(_) => SqlFilter {
                clause: format!("{column} -> {path} = json(?)"),
                params: vec![label, SqlValue::Text(value.to_string())],
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use divan_core::query::Filter;

    use super::*;

    #[test]
    fn translates_string_equality() {
        let filter = SqlQueryTranslator::new("\"doc\"")
            .visit_expr(&Filter::eq("type", "collection"))
            .unwrap();

        assert_eq!(
            filter.clause,
            "json_type(\"doc\", ('$.' || json_quote(?))) = 'text' AND \"doc\" ->> ('$.' || json_quote(?)) = ?",
        );
        assert_eq!(
            filter.params,
            vec![
                SqlValue::Text("type".into()),
                SqlValue::Text("type".into()),
                SqlValue::Text("collection".into()),
            ],
        );
    }

    #[test]
    fn and_concatenates_params_in_order() {
        let filter = SqlQueryTranslator::new("\"doc\"")
            .visit_expr(&Filter::eq("a", 1).and(Filter::eq("b", json!([1]))))
            .unwrap();

        assert!(filter.clause.contains(") AND ("));
        assert_eq!(filter.params.len(), 5);
        assert_eq!(filter.params[2], SqlValue::Integer(1));
        assert_eq!(filter.params[4], SqlValue::Text("[1]".into()));
    }
}
