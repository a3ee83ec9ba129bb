//! Explicit transaction scope handle.
//!
//! # Responsibility
//! - Replace ambient auto-commit toggling with a value the orchestrator owns.
//! - Join an already-open caller transaction through a savepoint.
//!
//! # Invariants
//! - `commit` and `rollback` consume the scope, so each scope finishes once.
//! - An owned scope never leaves the connection outside autocommit after it
//!   finishes.
//! - A nested scope never commits the caller's transaction.
//! - Dropping an unfinished scope rolls it back.

use super::DbResult;
use log::warn;
use rusqlite::Connection;

const NESTED_SAVEPOINT: &str = "mdr_scope";

/// Lock acquisition mode for owned transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// Locks are taken lazily on first read/write.
    #[default]
    Deferred,
    /// Reserved write lock is taken at `BEGIN`, serializing writers.
    Immediate,
    /// Exclusive lock is taken at `BEGIN`.
    Exclusive,
}

impl TransactionMode {
    fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED;",
            Self::Immediate => "BEGIN IMMEDIATE;",
            Self::Exclusive => "BEGIN EXCLUSIVE;",
        }
    }
}

/// Connection state observed when the scope was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Connection was in autocommit; this scope owns a real transaction.
    Owned,
    /// Caller already had a transaction open; this scope is a savepoint.
    Nested,
}

/// One unit of work on a shared connection.
///
/// Stores receive the same `&Connection` and run inside the scope without
/// knowing whether it is owned or nested.
#[derive(Debug)]
pub struct TxScope<'conn> {
    conn: &'conn Connection,
    kind: ScopeKind,
    finished: bool,
}

impl<'conn> TxScope<'conn> {
    /// Opens a scope, owning a new transaction or joining the caller's.
    pub fn begin(conn: &'conn Connection, mode: TransactionMode) -> DbResult<Self> {
        let kind = if conn.is_autocommit() {
            conn.execute_batch(mode.begin_sql())?;
            ScopeKind::Owned
        } else {
            conn.execute_batch(&format!("SAVEPOINT {NESTED_SAVEPOINT};"))?;
            ScopeKind::Nested
        };

        Ok(Self {
            conn,
            kind,
            finished: false,
        })
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Makes the scope's writes durable (owned) or merges them into the
    /// caller's transaction (nested).
    pub fn commit(mut self) -> DbResult<()> {
        let sql = match self.kind {
            ScopeKind::Owned => "COMMIT;".to_string(),
            ScopeKind::Nested => format!("RELEASE SAVEPOINT {NESTED_SAVEPOINT};"),
        };
        self.finished = true;
        if let Err(err) = self.conn.execute_batch(&sql) {
            // A failed COMMIT can leave the transaction open.
            self.undo();
            return Err(err.into());
        }
        Ok(())
    }

    /// Discards every write made inside the scope.
    pub fn rollback(mut self) -> DbResult<()> {
        let outcome = self.conn.execute_batch(&self.rollback_sql());
        self.finished = true;
        if let Err(err) = outcome {
            // A failed ROLLBACK can leave the transaction open.
            self.undo();
            return Err(err.into());
        }
        Ok(())
    }

    fn rollback_sql(&self) -> String {
        match self.kind {
            ScopeKind::Owned => "ROLLBACK;".to_string(),
            ScopeKind::Nested => format!(
                "ROLLBACK TO SAVEPOINT {NESTED_SAVEPOINT}; RELEASE SAVEPOINT {NESTED_SAVEPOINT};"
            ),
        }
    }

    fn undo(&self) {
        if self.kind == ScopeKind::Owned && self.conn.is_autocommit() {
            return;
        }
        if let Err(err) = self.conn.execute_batch(&self.rollback_sql()) {
            warn!(
                "event=tx_rollback module=db status=error kind={:?} error={}",
                self.kind, err
            );
        }
    }
}

impl Drop for TxScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            "event=tx_rollback module=db status=start kind={:?} reason=dropped_unfinished",
            self.kind
        );
        self.undo();
    }
}

#[cfg(test)]
mod tests {
    use super::{ScopeKind, TransactionMode, TxScope};
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL);")
            .unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn owned_scope_commits_and_restores_autocommit() {
        let conn = setup();
        let scope = TxScope::begin(&conn, TransactionMode::Immediate).unwrap();
        assert_eq!(scope.kind(), ScopeKind::Owned);
        assert!(!conn.is_autocommit());

        conn.execute("INSERT INTO t (v) VALUES (1);", []).unwrap();
        scope.commit().unwrap();

        assert!(conn.is_autocommit());
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn owned_scope_rollback_discards_writes() {
        let conn = setup();
        let scope = TxScope::begin(&conn, TransactionMode::Deferred).unwrap();
        conn.execute("INSERT INTO t (v) VALUES (1);", []).unwrap();
        scope.rollback().unwrap();

        assert!(conn.is_autocommit());
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn dropped_scope_rolls_back() {
        let conn = setup();
        {
            let _scope = TxScope::begin(&conn, TransactionMode::Immediate).unwrap();
            conn.execute("INSERT INTO t (v) VALUES (1);", []).unwrap();
        }

        assert!(conn.is_autocommit());
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn nested_scope_does_not_commit_outer_transaction() {
        let conn = setup();
        conn.execute_batch("BEGIN;").unwrap();

        let scope = TxScope::begin(&conn, TransactionMode::Immediate).unwrap();
        assert_eq!(scope.kind(), ScopeKind::Nested);
        conn.execute("INSERT INTO t (v) VALUES (1);", []).unwrap();
        scope.commit().unwrap();

        assert!(!conn.is_autocommit());
        conn.execute_batch("ROLLBACK;").unwrap();
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn nested_rollback_keeps_outer_writes() {
        let conn = setup();
        conn.execute_batch("BEGIN;").unwrap();
        conn.execute("INSERT INTO t (v) VALUES (1);", []).unwrap();

        let scope = TxScope::begin(&conn, TransactionMode::Deferred).unwrap();
        conn.execute("INSERT INTO t (v) VALUES (2);", []).unwrap();
        scope.rollback().unwrap();

        conn.execute_batch("COMMIT;").unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn failed_rollback_reports_error_and_leaves_connection_usable() {
        let conn = setup();
        let scope = TxScope::begin(&conn, TransactionMode::Immediate).unwrap();
        conn.execute("INSERT INTO t (v) VALUES (1);", []).unwrap();
        conn.execute_batch("COMMIT;").unwrap();

        assert!(scope.rollback().is_err());
        assert!(conn.is_autocommit());

        let next = TxScope::begin(&conn, TransactionMode::Immediate).unwrap();
        assert_eq!(next.kind(), ScopeKind::Owned);
        conn.execute("INSERT INTO t (v) VALUES (2);", []).unwrap();
        next.rollback().unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn failed_nested_rollback_keeps_caller_transaction_open() {
        let conn = setup();
        conn.execute_batch("BEGIN;").unwrap();
        let scope = TxScope::begin(&conn, TransactionMode::Deferred).unwrap();
        conn.execute_batch("RELEASE SAVEPOINT mdr_scope;").unwrap();

        assert!(scope.rollback().is_err());
        assert!(!conn.is_autocommit());
        conn.execute_batch("ROLLBACK;").unwrap();
    }
}
