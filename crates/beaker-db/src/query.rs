//! Finalized statements: SQL text plus ordered bound values.

use crate::error::DbResult;
use crate::row::Record;
use crate::transaction::Transaction;
use crate::value::Value;
use regex::Regex;
use std::sync::OnceLock;

/// A statement ready to run: SQL with `$n` placeholders and the values for
/// them, in order.
///
/// # Example
///
/// ```ignore
/// use beaker_db::query;
///
/// let rows = query("SELECT * FROM users WHERE id = $1")
///     .bind(5)
///     .fetch_all(&mut tx)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    values: Vec<Value>,
}

/// Create a new query with the given SQL
pub fn query(sql: impl Into<String>) -> Query {
    Query::new(sql, Vec::new())
}

impl Query {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    /// Bind the next positional value
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.values)
    }

    /// Execute the query and return all rows
    pub fn fetch_all(&self, tx: &mut Transaction) -> DbResult<Vec<Record>> {
        tx.find_all(&self.sql, &self.values)
    }

    /// Execute the query and return the first row, if any
    pub fn fetch_one(&self, tx: &mut Transaction) -> DbResult<Option<Record>> {
        tx.find_one(&self.sql, &self.values)
    }

    /// Execute the query and return the number of affected rows
    pub fn execute(&self, tx: &mut Transaction) -> DbResult<u64> {
        tx.save(&self.sql, &self.values)
    }
}

/// Normalize a generated statement: collapse runs of spaces (ASCII and
/// ideographic) to one, drop a single trailing space, and terminate with `;`.
pub fn finalize_sql(sql: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let spaces =
        SPACES.get_or_init(|| Regex::new("[ \u{3000}]+").expect("invalid built-in spaces regex"));

    let mut out = spaces.replace_all(sql, " ").into_owned();
    if out.ends_with(' ') {
        out.pop();
    }
    out.push(';');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_collapses_and_terminates() {
        assert_eq!(
            finalize_sql("SELECT * FROM users  WHERE   id = $1 "),
            "SELECT * FROM users WHERE id = $1;"
        );
    }

    #[test]
    fn finalize_collapses_ideographic_spaces() {
        assert_eq!(
            finalize_sql("SELECT\u{3000}* FROM\u{3000} users"),
            "SELECT * FROM users;"
        );
    }

    #[test]
    fn finalize_strips_only_one_trailing_space() {
        // runs collapse first, so at most one space is left to strip
        assert_eq!(finalize_sql("DELETE FROM t    "), "DELETE FROM t;");
    }

    #[test]
    fn finalize_keeps_leading_space_and_newlines() {
        assert_eq!(finalize_sql("  SELECT 1"), " SELECT 1;");
        assert_eq!(finalize_sql("SELECT\n1"), "SELECT\n1;");
    }

    #[test]
    fn bind_appends_in_order() {
        let q = query("SELECT * FROM t WHERE a = $1 AND b = $2")
            .bind(1)
            .bind("x");
        assert_eq!(q.values(), &[Value::Int(1), Value::Text("x".into())]);
    }
}
