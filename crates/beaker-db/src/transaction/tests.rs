use super::*;
use crate::testing::{Event, MockProvider};

#[test]
fn read_write_commits_on_success() {
    let provider = MockProvider::new().with_affected(1);
    let n = TransactionOptions::read_write()
        .run(&provider, |tx| tx.save("UPDATE t SET a = $1;", &[Value::Int(1)]))
        .unwrap();

    assert_eq!(n, 1);
    assert_eq!(
        provider.events(),
        vec![
            Event::Connect,
            Event::Begin,
            Event::Execute("UPDATE t SET a = $1;".into(), vec![Value::Int(1)]),
            Event::Commit,
            Event::Close,
        ]
    );
}

#[test]
fn read_write_rolls_back_then_releases_on_error() {
    let provider = MockProvider::new().failing_on("UPDATE");
    let err = TransactionOptions::read_write()
        .run(&provider, |tx| tx.save("UPDATE t SET a = 1;", &[]))
        .unwrap_err();

    assert!(err.is_execution());
    let events = provider.events();
    assert_eq!(&events[events.len() - 2..], &[Event::Rollback, Event::Close]);
    assert_eq!(provider.count(&Event::Commit), 0);
}

#[test]
fn caller_error_also_rolls_back() {
    let provider = MockProvider::new();
    let err = TransactionOptions::read_write()
        .run(&provider, |tx| -> DbResult<()> {
            tx.save("INSERT INTO t (a) VALUES ($1);", &[Value::Int(1)])?;
            Err(DbError::validation("payload rejected"))
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "Validation error: payload rejected");
    assert_eq!(provider.count(&Event::Rollback), 1);
    assert_eq!(provider.count(&Event::Close), 1);
}

#[test]
fn read_only_never_commits_or_rolls_back() {
    let provider = MockProvider::new();
    TransactionOptions::read_only()
        .run(&provider, |tx| tx.find_all("SELECT 1;", &[]))
        .unwrap();
    let _ = TransactionOptions::read_only()
        .run(&provider, |_| -> DbResult<()> { Err(DbError::MissingTable) });

    assert_eq!(provider.count(&Event::Commit), 0);
    assert_eq!(provider.count(&Event::Rollback), 0);
    assert_eq!(provider.count(&Event::Connect), 2);
    assert_eq!(provider.count(&Event::Close), 2);
}

#[test]
fn default_options_are_read_only() {
    assert!(TransactionOptions::default().is_read_only());
    assert!(!TransactionOptions::read_write().is_read_only());
}

#[test]
fn schema_override_applied_on_open() {
    let provider = MockProvider::new();
    let tx = TransactionOptions::read_only()
        .schema("tenant_a")
        .open(&provider)
        .unwrap();
    assert_eq!(tx.schema(), Some("tenant_a"));
    tx.close(true).unwrap();

    assert_eq!(
        provider.statements(),
        vec!["SET search_path TO tenant_a,public;".to_string()]
    );
}

#[test]
fn invalid_schema_fails_open_and_releases() {
    let provider = MockProvider::new();
    let err = TransactionOptions::read_write()
        .schema("x; DROP TABLE users")
        .open(&provider)
        .unwrap_err();

    assert!(matches!(err, DbError::Validation(_)));
    assert_eq!(provider.count(&Event::Rollback), 1);
    assert_eq!(provider.count(&Event::Close), 1);
    assert!(provider.statements().is_empty());
}

#[test]
fn connect_failure_propagates() {
    let provider = MockProvider::new().refusing_connections();
    let mut called = false;
    let err = TransactionOptions::read_write()
        .run(&provider, |_| {
            called = true;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, DbError::Connection(_)));
    assert!(!called);
}

#[test]
fn find_one_returns_first_row_or_none() {
    let rows = vec![
        Record::new().with("id", 1),
        Record::new().with("id", 2),
    ];
    let provider = MockProvider::new().with_rows(rows);
    let mut tx = TransactionOptions::read_only().open(&provider).unwrap();
    let row = tx.find_one("SELECT id FROM t;", &[]).unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Int(1)));
    assert_eq!(tx.find_all("SELECT id FROM t;", &[]).unwrap().len(), 2);
    tx.close(true).unwrap();

    let empty = MockProvider::new();
    let mut tx = TransactionOptions::read_only().open(&empty).unwrap();
    assert!(tx.find_one("SELECT id FROM t;", &[]).unwrap().is_none());
    tx.close(true).unwrap();
}

#[test]
fn delete_and_ddl_go_to_the_connection() {
    let provider = MockProvider::new().with_affected(3);
    TransactionOptions::read_write()
        .run(&provider, |tx| {
            tx.execute_ddl("CREATE TABLE t (id int);")?;
            assert_eq!(tx.delete("DELETE FROM t;", &[])?, 3);
            Ok(())
        })
        .unwrap();

    assert_eq!(
        provider.statements(),
        vec!["CREATE TABLE t (id int);".to_string(), "DELETE FROM t;".to_string()]
    );
}

#[test]
fn drop_without_close_rolls_back_and_releases() {
    let provider = MockProvider::new();
    {
        let mut tx = TransactionOptions::read_write().open(&provider).unwrap();
        tx.save("INSERT INTO t (a) VALUES (1);", &[]).unwrap();
    }
    let events = provider.events();
    assert_eq!(&events[events.len() - 2..], &[Event::Rollback, Event::Close]);
}

#[test]
fn explicit_close_runs_once() {
    let provider = MockProvider::new();
    let tx = TransactionOptions::read_write().open(&provider).unwrap();
    tx.close(true).unwrap();
    assert_eq!(provider.count(&Event::Commit), 1);
    assert_eq!(provider.count(&Event::Close), 1);
    assert_eq!(provider.count(&Event::Rollback), 0);
}

#[test]
fn failed_rollback_is_reported_with_the_body_error() {
    let provider = MockProvider::new()
        .failing_on("UPDATE")
        .failing_on("ROLLBACK");
    let err = TransactionOptions::read_write()
        .run(&provider, |tx| tx.save("UPDATE t SET a = 1;", &[]))
        .unwrap_err();

    let DbError::CloseFailed { source, close } = &err else {
        panic!("expected CloseFailed, got {err:?}");
    };
    assert!(source.to_string().contains("UPDATE t SET a = 1;"));
    assert!(close.to_string().contains("ROLLBACK"));
    assert!(err.is_execution());
    assert!(err.to_string().contains("closing the transaction also failed"));
    assert_eq!(provider.count(&Event::Close), 1);
}

#[test]
fn successful_rollback_returns_the_body_error_as_is() {
    let provider = MockProvider::new().failing_on("UPDATE");
    let err = TransactionOptions::read_write()
        .run(&provider, |tx| tx.save("UPDATE t SET a = 1;", &[]))
        .unwrap_err();
    assert!(matches!(err, DbError::Execution(_)));
}

#[test]
fn failed_begin_is_reported_and_connection_released() {
    let provider = MockProvider::new().failing_on("BEGIN");
    let err = TransactionOptions::read_write().open(&provider).unwrap_err();
    assert!(matches!(err, DbError::Execution(_)));
    assert_eq!(provider.count(&Event::Close), 1);
}

#[test]
fn failed_schema_switch_keeps_rollback_failure() {
    let provider = MockProvider::new()
        .failing_on("search_path")
        .failing_on("ROLLBACK");
    let err = TransactionOptions::read_write()
        .schema("tenant_a")
        .open(&provider)
        .unwrap_err();
    assert!(matches!(err, DbError::CloseFailed { .. }));
    assert_eq!(provider.count(&Event::Close), 1);
}

#[test]
fn statements_run_on_the_same_connection_until_close() {
    let provider = MockProvider::new();
    let mut tx = TransactionOptions::read_write().open(&provider).unwrap();
    for i in 0..3 {
        tx.save("UPDATE t SET a = $1;", &[Value::Int(i)]).unwrap();
    }
    tx.close(true).unwrap();
    assert_eq!(provider.count(&Event::Connect), 1);
    assert_eq!(provider.statements().len(), 3);
}
