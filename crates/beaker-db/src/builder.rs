//! Fluent builder for single-table SELECT/INSERT/UPDATE/DELETE statements.
//!
//! A [`QueryBuilder`] is bound to exactly one of:
//! - a caller-owned [`Transaction`]: statements run inside it and the caller
//!   decides when to commit.
//! - a [`ConnectionProvider`]: every terminal operation opens its own
//!   short-lived transaction (read-only for selects, read-write otherwise)
//!   and closes it before returning.
//!
//! # Example
//!
//! ```ignore
//! use beaker_db::QueryBuilder;
//!
//! let rows = QueryBuilder::with_provider(&connector)
//!     .table("users")
//!     .and_where("id", "=", 5)
//!     .or_where("name", "=", "ann")
//!     .select(&[])?;
//!
//! let n = QueryBuilder::with_transaction(&mut tx)
//!     .table_in_schema("users", "tenant_a")?
//!     .and_where("id", "=", 5)
//!     .update([("name", "bob")])?;
//! ```

use crate::condition::{Combinator, ConditionGroup, Predicate};
use crate::connector::ConnectionProvider;
use crate::error::{DbError, DbResult};
use crate::query::{Query, finalize_sql};
use crate::row::Record;
use crate::transaction::{Transaction, TransactionOptions};
use crate::value::Value;

enum Binding<'a> {
    Transaction(&'a mut Transaction),
    Provider(&'a dyn ConnectionProvider),
}

/// One-shot statement builder. Terminal operations consume it.
pub struct QueryBuilder<'a> {
    binding: Binding<'a>,
    table: Option<String>,
    schema: Option<String>,
    conditions: ConditionGroup,
}

impl std::fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound_to = match self.binding {
            Binding::Transaction(_) => "transaction",
            Binding::Provider(_) => "provider",
        };
        f.debug_struct("QueryBuilder")
            .field("bound_to", &bound_to)
            .field("table", &self.table)
            .field("schema", &self.schema)
            .field("conditions", &self.conditions)
            .finish()
    }
}

impl<'a> QueryBuilder<'a> {
    /// Bind to exactly one of `provider` or `tx`.
    pub fn new(
        provider: Option<&'a dyn ConnectionProvider>,
        tx: Option<&'a mut Transaction>,
    ) -> DbResult<Self> {
        let binding = match (provider, tx) {
            (Some(_), Some(_)) => return Err(DbError::DualBinding("both were given")),
            (None, None) => return Err(DbError::DualBinding("neither was given")),
            (Some(provider), None) => Binding::Provider(provider),
            (None, Some(tx)) => Binding::Transaction(tx),
        };
        Ok(Self::bound(binding))
    }

    /// Each terminal operation manages its own transaction.
    pub fn with_provider(provider: &'a dyn ConnectionProvider) -> Self {
        Self::bound(Binding::Provider(provider))
    }

    /// Statements run inside `tx`; commit and rollback stay with the caller.
    pub fn with_transaction(tx: &'a mut Transaction) -> Self {
        Self::bound(Binding::Transaction(tx))
    }

    fn bound(binding: Binding<'a>) -> Self {
        Self {
            binding,
            table: None,
            schema: None,
            conditions: ConditionGroup::root(),
        }
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self.schema = None;
        self
    }

    /// Target `name` with `search_path` switched to `schema` first.
    ///
    /// Only a transaction-bound builder can do this; the schema is a session
    /// setting and has nowhere to live on an ad-hoc connection.
    pub fn table_in_schema(
        mut self,
        name: impl Into<String>,
        schema: impl Into<String>,
    ) -> DbResult<Self> {
        let schema = schema.into();
        if let Binding::Provider(_) = self.binding {
            return Err(DbError::InvalidSchemaUsage(format!(
                "schema '{schema}' needs a caller-supplied transaction"
            )));
        }
        self.table = Some(name.into());
        self.schema = Some(schema);
        Ok(self)
    }

    /// Append `field op value`, joined to what precedes it with `AND`.
    pub fn and_where(
        mut self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions
            .add(ConditionGroup::single(Predicate::and(field, op, value)));
        self
    }

    /// Append `field op value`, joined to what precedes it with `OR`.
    pub fn or_where(
        mut self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions
            .add(ConditionGroup::single(Predicate::or(field, op, value)));
        self
    }

    /// Append a nested group built by `f`, joined with `combinator`.
    ///
    /// ```ignore
    /// builder.and_where("active", "=", true)
    ///     .where_group(Combinator::And, |g| g.and_where("age", ">", 18).or_where("vip", "=", true));
    /// // active = $1 AND (age > $2 OR vip = $3)
    /// ```
    pub fn where_group<F>(mut self, combinator: Combinator, f: F) -> Self
    where
        F: FnOnce(ConditionGroup) -> ConditionGroup,
    {
        self.conditions.add(f(ConditionGroup::new(combinator)));
        self
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn require_table(&self) -> DbResult<&str> {
        self.table.as_deref().ok_or(DbError::MissingTable)
    }

    /// ` WHERE ...` with placeholders numbered after `values`, or nothing.
    fn where_clause(&self, values: &mut Vec<Value>) -> DbResult<String> {
        if self.conditions.is_empty() {
            return Ok(String::new());
        }
        let mut idx = values.len();
        let rendered = self.conditions.render(&mut idx)?;
        values.extend(rendered.values);
        Ok(format!(" WHERE {}", rendered.sql))
    }

    pub fn build_select(&self, fields: &[&str]) -> DbResult<Query> {
        let table = self.require_table()?;
        let columns = if fields.is_empty() {
            "*".to_string()
        } else {
            fields.join(", ")
        };
        let mut values = Vec::new();
        let where_sql = self.where_clause(&mut values)?;
        let sql = format!("SELECT {columns} FROM {table}{where_sql}");
        Ok(Query::new(finalize_sql(&sql), values))
    }

    /// Same statement as [`build_select`](Self::build_select); only the fetch
    /// differs.
    pub fn build_select_one(&self, fields: &[&str]) -> DbResult<Query> {
        self.build_select(fields)
    }

    pub fn build_insert<I, K, V>(&self, payload: I) -> DbResult<Query>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let table = self.require_table()?;
        let fields = collect_payload(payload);
        if fields.is_empty() {
            return Err(DbError::EmptyPayload("insert"));
        }

        let mut keys = Vec::with_capacity(fields.len());
        let mut placeholders = Vec::with_capacity(fields.len());
        let mut values = Vec::with_capacity(fields.len());
        for (i, (key, value)) in fields.into_iter().enumerate() {
            placeholders.push(value.placeholder(i + 1));
            keys.push(key);
            values.push(value);
        }

        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            keys.join(", "),
            placeholders.join(", ")
        );
        Ok(Query::new(finalize_sql(&sql), values))
    }

    /// `UPDATE ... SET ...` binds the SET values first, then the WHERE values.
    pub fn build_update<I, K, V>(&self, payload: I) -> DbResult<Query>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = collect_payload(payload);
        if fields.is_empty() {
            return Err(DbError::EmptyPayload("update"));
        }
        let table = self.require_table()?;

        let mut assignments = Vec::with_capacity(fields.len());
        let mut values = Vec::with_capacity(fields.len());
        for (i, (key, value)) in fields.into_iter().enumerate() {
            assignments.push(format!("{key} = {}", value.placeholder(i + 1)));
            values.push(value);
        }
        let where_sql = self.where_clause(&mut values)?;

        let sql = format!("UPDATE {table} SET {}{where_sql}", assignments.join(", "));
        Ok(Query::new(finalize_sql(&sql), values))
    }

    pub fn build_delete(&self) -> DbResult<Query> {
        let table = self.require_table()?;
        let mut values = Vec::new();
        let where_sql = self.where_clause(&mut values)?;
        let sql = format!("DELETE FROM {table}{where_sql}");
        Ok(Query::new(finalize_sql(&sql), values))
    }

    /// Every matching row. An empty `fields` selects `*`.
    pub fn select(self, fields: &[&str]) -> DbResult<Vec<Record>> {
        let query = self.build_select(fields)?;
        self.execute(true, |tx| query.fetch_all(tx))
    }

    /// The first matching row, if any.
    pub fn select_one(self, fields: &[&str]) -> DbResult<Option<Record>> {
        let query = self.build_select_one(fields)?;
        self.execute(true, |tx| query.fetch_one(tx))
    }

    /// Insert one row; returns the affected row count.
    pub fn insert<I, K, V>(self, payload: I) -> DbResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let query = self.build_insert(payload)?;
        self.execute(false, |tx| query.execute(tx))
    }

    /// Update matching rows; returns the affected row count.
    pub fn update<I, K, V>(self, payload: I) -> DbResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let query = self.build_update(payload)?;
        self.execute(false, |tx| query.execute(tx))
    }

    /// Delete matching rows; returns the affected row count.
    pub fn delete(self) -> DbResult<u64> {
        let query = self.build_delete()?;
        self.execute(false, |tx| tx.delete(query.sql(), query.values()))
    }

    fn execute<T, F>(self, read_only: bool, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Transaction) -> DbResult<T>,
    {
        match self.binding {
            Binding::Transaction(tx) => {
                if let Some(schema) = &self.schema {
                    tx.change_schema(schema)?;
                }
                f(tx)
            }
            Binding::Provider(provider) => TransactionOptions::new(read_only)
                .schema_opt(self.schema)
                .run(provider, f),
        }
    }
}

fn collect_payload<I, K, V>(payload: I) -> Vec<(String, Value)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    payload
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
