//! Connection trait for unified, blocking database access.

use crate::error::{DbError, DbResult};
use crate::row::Record;
use crate::value::Value;
use postgres::types::ToSql;
use postgres::{Client, NoTls};

/// A live database session.
///
/// A [`Transaction`](crate::Transaction) owns exactly one `Connection` for
/// its whole scope; nothing else touches it meanwhile.
pub trait Connection: Send {
    /// Execute a query and return all rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>>;

    /// Execute a query and return the first row, if any.
    ///
    /// Extra rows are ignored, not an error.
    fn query_opt(&mut self, sql: &str, params: &[Value]) -> DbResult<Option<Record>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<u64>;

    /// Run one or more unparameterized statements.
    fn batch_execute(&mut self, sql: &str) -> DbResult<()>;

    fn begin(&mut self) -> DbResult<()> {
        self.batch_execute("BEGIN")
    }

    fn commit(&mut self) -> DbResult<()> {
        self.batch_execute("COMMIT")
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.batch_execute("ROLLBACK")
    }

    /// Release the session. Work not committed by then is discarded by the
    /// server.
    fn close(self: Box<Self>) -> DbResult<()>;
}

/// [`Connection`] over a blocking `postgres::Client`.
pub struct PgConnection {
    client: Client,
}

impl PgConnection {
    /// Connect with a libpq-style connection string.
    pub fn connect(connection_string: &str) -> DbResult<Self> {
        let client = Client::connect(connection_string, NoTls)
            .map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already connected client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn params(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
        values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

impl Connection for PgConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        let rows = self.client.query(sql, &Self::params(params))?;
        rows.iter().map(Record::from_row).collect()
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        Ok(self.client.execute(sql, &Self::params(params))?)
    }

    fn batch_execute(&mut self, sql: &str) -> DbResult<()> {
        Ok(self.client.batch_execute(sql)?)
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        Ok(self.client.close()?)
    }
}
