//! In-memory connection provider that records everything sent to it.

use crate::client::Connection;
use crate::connector::ConnectionProvider;
use crate::error::{DbError, DbResult};
use crate::row::Record;
use crate::value::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Connect,
    Begin,
    Query(String, Vec<Value>),
    Execute(String, Vec<Value>),
    Batch(String),
    Commit,
    Rollback,
    Close,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    rows: Vec<Record>,
    affected: u64,
    fail_matching: Vec<String>,
    fail_connect: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MockProvider {
    state: Arc<Mutex<State>>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rows returned by every query.
    pub(crate) fn with_rows(self, rows: Vec<Record>) -> Self {
        self.state.lock().unwrap().rows = rows;
        self
    }

    pub(crate) fn with_affected(self, n: u64) -> Self {
        self.state.lock().unwrap().affected = n;
        self
    }

    /// Statements containing `needle` fail with an execution error. Can be
    /// called more than once.
    pub(crate) fn failing_on(self, needle: &str) -> Self {
        self.state.lock().unwrap().fail_matching.push(needle.to_string());
        self
    }

    pub(crate) fn refusing_connections(self) -> Self {
        self.state.lock().unwrap().fail_connect = true;
        self
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub(crate) fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    /// Statements (queries, executes and batches) in order.
    pub(crate) fn statements(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Query(sql, _) | Event::Execute(sql, _) | Event::Batch(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }
}

impl ConnectionProvider for MockProvider {
    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connect {
            return Err(DbError::Connection("connection refused".to_string()));
        }
        state.events.push(Event::Connect);
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl MockConnection {
    fn record(&self, event: Event, sql: &str) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(event);
        if state.fail_matching.iter().any(|needle| sql.contains(needle.as_str())) {
            return Err(DbError::execution(format!("mock failure on: {sql}")));
        }
        Ok(())
    }
}

impl Connection for MockConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        self.record(Event::Query(sql.to_string(), params.to_vec()), sql)?;
        Ok(self.state.lock().unwrap().rows.clone())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.record(Event::Execute(sql.to_string(), params.to_vec()), sql)?;
        Ok(self.state.lock().unwrap().affected)
    }

    fn batch_execute(&mut self, sql: &str) -> DbResult<()> {
        self.record(Event::Batch(sql.to_string()), sql)
    }

    fn begin(&mut self) -> DbResult<()> {
        self.record(Event::Begin, "BEGIN")
    }

    fn commit(&mut self) -> DbResult<()> {
        self.record(Event::Commit, "COMMIT")
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.record(Event::Rollback, "ROLLBACK")
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        self.state.lock().unwrap().events.push(Event::Close);
        Ok(())
    }
}
