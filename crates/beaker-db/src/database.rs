//! Application-level entry point over a shared connection provider.

use crate::builder::QueryBuilder;
use crate::config::DatabaseConfig;
use crate::connector::{ConnectionProvider, DbConnector};
use crate::error::DbResult;
use crate::transaction::{Transaction, TransactionOptions};
use std::sync::Arc;

/// Cheap-to-clone handle that hands out transactions and query builders.
///
/// Construct one at startup and pass it to whatever needs database access.
///
/// ```ignore
/// let db = Database::from_config(&AppConfig::load("beaker.toml")?.database);
///
/// let user = db.query().table("users").and_where("id", "=", 5).select_one(&[])?;
///
/// db.run(false, |tx| {
///     db.query_in(tx).table("users").and_where("id", "=", 5).update([("name", "ann")])?;
///     db.query_in(tx).table("audit").insert([("action", "rename")])?;
///     Ok(())
/// })?;
/// ```
#[derive(Clone)]
pub struct Database {
    provider: Arc<dyn ConnectionProvider>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    pub fn new(provider: impl ConnectionProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(DbConnector::from_config(config))
    }

    pub fn provider(&self) -> &dyn ConnectionProvider {
        self.provider.as_ref()
    }

    /// Unopened transaction settings; call `open` or `run` on the result.
    pub fn transaction(&self, read_only: bool) -> TransactionOptions {
        TransactionOptions::new(read_only)
    }

    /// Open a transaction now. The caller must `close` it.
    pub fn begin(&self, read_only: bool) -> DbResult<Transaction> {
        self.transaction(read_only).open(self.provider())
    }

    /// Run `f` in a transaction that is committed or rolled back on return.
    pub fn run<T, F>(&self, read_only: bool, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Transaction) -> DbResult<T>,
    {
        self.transaction(read_only).run(self.provider(), f)
    }

    /// Builder that opens its own transaction per statement.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::with_provider(self.provider())
    }

    /// Builder bound to `tx`.
    pub fn query_in<'t>(&self, tx: &'t mut Transaction) -> QueryBuilder<'t> {
        QueryBuilder::with_transaction(tx)
    }
}
