//! Connection parameters and the providers that turn them into sessions.

use crate::client::{Connection, PgConnection};
use crate::config::DatabaseConfig;
use crate::error::DbResult;
use std::fmt;

/// Produces a fresh [`Connection`] per call.
///
/// Implementations hold only immutable settings, so one provider can serve
/// any number of independent transactions, each with its own connection.
pub trait ConnectionProvider: Send + Sync {
    fn connect(&self) -> DbResult<Box<dyn Connection>>;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        (**self).connect()
    }
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for std::sync::Arc<P> {
    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        (**self).connect()
    }
}

/// Database name, host, user and credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    dbname: String,
    host: String,
    user: String,
    password: String,
}

impl ConnectionParams {
    pub fn new(
        dbname: impl Into<String>,
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            dbname: dbname.into(),
            host: host.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// `dbname=... host=... user=... password=...`, values quoted.
    pub fn connection_string(&self) -> String {
        format!(
            "dbname={} host={} user={} password={}",
            quote(&self.dbname),
            quote(&self.host),
            quote(&self.user),
            quote(&self.password)
        )
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

// Never print the credential.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("dbname", &self.dbname)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dbname={} host={} user={} password=***",
            self.dbname, self.host, self.user
        )
    }
}

/// [`ConnectionProvider`] that opens a new PostgreSQL session per call.
#[derive(Debug, Clone)]
pub struct DbConnector {
    params: ConnectionParams,
}

impl DbConnector {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(ConnectionParams::new(
            &config.dbname,
            &config.host,
            &config.user,
            &config.password,
        ))
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }
}

impl ConnectionProvider for DbConnector {
    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        tracing::debug!(target: "beaker_db::connect", params = %self.params, "opening connection");
        let conn = PgConnection::connect(&self.params.connection_string())?;
        Ok(Box::new(conn))
    }
}
