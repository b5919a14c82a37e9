//! Scoped transactions over one connection.
//!
//! A [`TransactionOptions`] is an unopened transaction. [`TransactionOptions::open`]
//! takes a connection from a [`ConnectionProvider`], starts the transaction and
//! applies the schema override; the resulting [`Transaction`] is the only way to
//! run statements. [`Transaction::close`] consumes it, so a closed transaction
//! cannot be reused.
//!
//! On close, a read-write transaction commits on success and rolls back
//! otherwise; a read-only one does neither. The connection is released in
//! every case. Dropping an open `Transaction` behaves like `close(false)`.
//!
//! # Example
//!
//! ```ignore
//! use beaker_db::{DbConnector, TransactionOptions};
//!
//! let users = TransactionOptions::read_only().run(&connector, |tx| {
//!     tx.find_all("SELECT * FROM users WHERE id = $1;", &[5.into()])
//! })?;
//!
//! TransactionOptions::read_write().run(&connector, |tx| {
//!     tx.save("UPDATE users SET name = $1 WHERE id = $2;", &["ann".into(), 5.into()])?;
//!     Ok(())
//! })?;
//! ```

use crate::client::Connection;
use crate::connector::ConnectionProvider;
use crate::error::{DbError, DbResult};
use crate::ident::schema_ident;
use crate::row::Record;
use crate::value::Value;

/// Settings for a transaction that has not been opened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOptions {
    read_only: bool,
    schema: Option<String>,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self::read_only()
    }
}

impl TransactionOptions {
    pub fn new(read_only: bool) -> Self {
        Self {
            read_only,
            schema: None,
        }
    }

    /// Query-only work: never commits or rolls back.
    pub fn read_only() -> Self {
        Self::new(true)
    }

    /// Commits on success, rolls back on failure.
    pub fn read_write() -> Self {
        Self::new(false)
    }

    /// Switch the session's `search_path` to `schema` right after opening.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn schema_opt(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Acquire a connection, begin, and apply the schema override.
    pub fn open(&self, provider: &dyn ConnectionProvider) -> DbResult<Transaction> {
        let mut conn = provider.connect()?;
        if let Err(err) = conn.begin() {
            return Err(match conn.close() {
                Ok(()) => err,
                Err(close) => err.with_close_failure(close),
            });
        }

        let mut tx = Transaction {
            conn: Some(conn),
            read_only: self.read_only,
            schema: self.schema.clone(),
        };
        tracing::debug!(target: "beaker_db::transaction", read_only = self.read_only, "transaction opened");

        if let Some(schema) = &self.schema {
            if let Err(err) = tx.change_schema(schema) {
                return Err(tx.fail(err));
            }
        }
        Ok(tx)
    }

    /// Run `f` inside a transaction that is closed on every exit path.
    ///
    /// `Ok` closes with success, `Err` closes with failure (rollback for
    /// read-write) before the error is returned. If that close fails too,
    /// both errors come back as [`DbError::CloseFailed`].
    pub fn run<T, F>(&self, provider: &dyn ConnectionProvider, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Transaction) -> DbResult<T>,
    {
        let mut tx = self.open(provider)?;
        match f(&mut tx) {
            Ok(value) => {
                tx.close(true)?;
                Ok(value)
            }
            Err(err) => {
                tracing::error!(target: "beaker_db::transaction", error = %err, "unit of work failed");
                Err(tx.fail(err))
            }
        }
    }
}

/// An open transaction that exclusively owns one connection.
pub struct Transaction {
    // `Some` from `open` until `close` or drop. Both take the connection out
    // by value, so it is always present behind `&mut self`.
    conn: Option<Box<dyn Connection>>,
    read_only: bool,
    schema: Option<String>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("open", &self.conn.is_some())
            .field("read_only", &self.read_only)
            .field("schema", &self.schema)
            .finish()
    }
}

impl Transaction {
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Schema the transaction was opened with.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn conn(&mut self) -> &mut (dyn Connection + 'static) {
        self.conn
            .as_deref_mut()
            .expect("connection is held until the transaction is closed")
    }

    /// Run a query and return every row.
    pub fn find_all(&mut self, sql: &str, values: &[Value]) -> DbResult<Vec<Record>> {
        log_statement(sql, values);
        let rows = self.conn().query(sql, values)?;
        tracing::debug!(target: "beaker_db::sql", rows = rows.len(), "result");
        Ok(rows)
    }

    /// Run a query and return its first row, if any.
    pub fn find_one(&mut self, sql: &str, values: &[Value]) -> DbResult<Option<Record>> {
        log_statement(sql, values);
        let row = self.conn().query_opt(sql, values)?;
        tracing::debug!(target: "beaker_db::sql", found = row.is_some(), "result");
        Ok(row)
    }

    /// Run a write statement; returns the affected row count.
    pub fn save(&mut self, sql: &str, values: &[Value]) -> DbResult<u64> {
        log_statement(sql, values);
        self.conn().execute(sql, values)
    }

    /// Run a delete statement; returns the affected row count.
    pub fn delete(&mut self, sql: &str, values: &[Value]) -> DbResult<u64> {
        log_statement(sql, values);
        self.conn().execute(sql, values)
    }

    /// `SET search_path TO <schema>,public` for the rest of the session.
    ///
    /// The schema is interpolated, not bound, so it must be a valid identifier.
    pub fn change_schema(&mut self, schema: &str) -> DbResult<()> {
        let ident = schema_ident(schema)?;
        tracing::info!(target: "beaker_db::transaction", schema = %ident, "changing search_path");
        self.conn()
            .batch_execute(&format!("SET search_path TO {ident},public;"))
    }

    /// Run DDL (or any unparameterized script) on this connection.
    pub fn execute_ddl(&mut self, sql: &str) -> DbResult<()> {
        log_statement(sql, &[]);
        self.conn().batch_execute(sql)
    }

    /// Commit or roll back (read-write only), then release the connection.
    pub fn close(mut self, success: bool) -> DbResult<()> {
        match self.conn.take() {
            Some(conn) => finish(conn, self.read_only, success),
            None => Ok(()),
        }
    }

    /// Close with failure and return `err`, carrying any close error along.
    fn fail(self, err: DbError) -> DbError {
        match self.close(false) {
            Ok(()) => err,
            Err(close) => {
                tracing::error!(target: "beaker_db::transaction", error = %close, "failed to close transaction");
                err.with_close_failure(close)
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!(
                target: "beaker_db::transaction",
                read_only = self.read_only,
                "transaction dropped without close, rolling back"
            );
            if let Err(err) = finish(conn, self.read_only, false) {
                tracing::error!(target: "beaker_db::transaction", error = %err, "failed to close transaction");
            }
        }
    }
}

fn finish(mut conn: Box<dyn Connection>, read_only: bool, success: bool) -> DbResult<()> {
    let outcome = match (read_only, success) {
        (true, _) => Ok(()),
        (false, true) => conn.commit(),
        (false, false) => conn.rollback(),
    };
    let released = conn.close();
    tracing::debug!(
        target: "beaker_db::transaction",
        read_only,
        success,
        "transaction closed"
    );
    outcome.and(released)
}

fn log_statement(sql: &str, values: &[Value]) {
    tracing::debug!(
        target: "beaker_db::sql",
        sql = %sql,
        param_count = values.len(),
        params = ?values,
        "statement"
    );
}

#[cfg(test)]
mod tests;
