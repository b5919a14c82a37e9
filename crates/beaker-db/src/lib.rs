//! # beaker-db
//!
//! Synchronous PostgreSQL data access for small web applications.
//!
//! ## Features
//!
//! - **Scoped transactions**: commit on success, roll back on failure, release
//!   the connection on every exit path
//! - **Fluent query builder**: AND/OR condition trees rendered to `$n`
//!   placeholders, with values bound in placeholder order
//! - **JSON values**: mappings and sequences are bound as `json` (`$n::json`)
//! - **Explicit wiring**: a [`Database`] handle built from [`DatabaseConfig`],
//!   no globals
//!
//! ## Example
//!
//! ```ignore
//! use beaker_db::{AppConfig, Database};
//!
//! let config = AppConfig::load("beaker.toml")?;
//! let db = Database::from_config(&config.database);
//!
//! // Self-managed: one short read-only transaction.
//! let users = db
//!     .query()
//!     .table("users")
//!     .and_where("id", "=", 5)
//!     .or_where("name", "=", "ann")
//!     .select(&[])?;
//!
//! // Caller-managed: several statements, one commit.
//! db.run(false, |tx| {
//!     db.query_in(tx)
//!         .table("users")
//!         .insert([("name", "ann")])?;
//!     beaker_db::query("UPDATE stats SET users = users + 1").execute(tx)?;
//!     Ok(())
//! })?;
//! ```

pub mod builder;
pub mod client;
pub mod condition;
pub mod config;
pub mod connector;
pub mod database;
pub mod error;
pub mod ident;
pub mod query;
pub mod row;
pub mod transaction;
mod types;
pub mod value;

#[cfg(test)]
mod testing;

pub use builder::QueryBuilder;
pub use client::{Connection, PgConnection};
pub use condition::{Combinator, Condition, ConditionGroup, Predicate, Rendered};
pub use config::{AppConfig, DatabaseConfig};
pub use connector::{ConnectionParams, ConnectionProvider, DbConnector};
pub use database::Database;
pub use error::{DbError, DbResult};
pub use query::{Query, finalize_sql, query};
pub use row::Record;
pub use transaction::{Transaction, TransactionOptions};
pub use value::Value;
