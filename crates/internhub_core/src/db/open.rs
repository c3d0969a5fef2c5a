//! Session bootstrap utilities for the relational store.
//!
//! # Responsibility
//! - Resolve relational connection strings to file or in-memory sessions.
//! - Configure pragmas the DAOs rely on (foreign keys, busy timeout).
//! - Trigger schema migrations before returning a usable session.
//!
//! # Invariants
//! - Returned sessions have `foreign_keys=ON`.
//! - Returned sessions have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MEMORY_URLS: &[&str] = &[":memory:", "sqlite::memory:", "sqlite://:memory:"];

/// Opens a relational session from a connection string.
///
/// Accepted forms: `:memory:`, `sqlite::memory:`, `sqlite://<path>`,
/// `sqlite:<path>` and a bare file path.
pub fn open_relational(url: &str) -> DbResult<Connection> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(DbError::InvalidUrl(url.to_string()));
    }
    if is_memory_url(trimmed) {
        return open_db_in_memory();
    }

    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    if path.is_empty() || path.contains("://") {
        return Err(DbError::InvalidUrl(url.to_string()));
    }
    open_db(path)
}

/// True when `url` names a private in-memory database.
pub fn is_memory_url(url: &str) -> bool {
    MEMORY_URLS.contains(&url.trim())
}

/// Opens the named in-memory database shared by every session of this
/// process that uses the same `name`.
///
/// The database lives only while at least one session on it stays open.
pub fn open_shared_memory(name: &str) -> DbResult<Connection> {
    let uri = format!("file:{name}?mode=memory&cache=shared");
    bootstrap("shared_memory", || {
        Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    })
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    bootstrap("file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    bootstrap("memory", Connection::open_in_memory)
}

fn bootstrap(
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = open().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
            started_at.elapsed().as_millis()
        );
        DbError::from(err)
    })?;

    if let Err(err) = configure_session(&mut conn) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={err}",
            started_at.elapsed().as_millis()
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn configure_session(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}

#[cfg(test)]
mod tests {
    use super::{is_memory_url, open_relational, open_shared_memory};
    use crate::db::DbError;

    #[test]
    fn memory_aliases_open_fresh_sessions() {
        for url in [":memory:", "sqlite::memory:", " sqlite://:memory: "] {
            assert!(is_memory_url(url));
            let conn = open_relational(url).expect("memory url should open");
            let fk: i64 = conn
                .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
                .expect("pragma should be readable");
            assert_eq!(fk, 1);
        }
    }

    #[test]
    fn shared_memory_sessions_see_each_other() {
        let first = open_shared_memory("open-rs-shared").expect("first session");
        first
            .execute(
                "INSERT INTO students (name, email, gpa, department) VALUES ('Ada', 'ada@uni.edu', 3.9, 'CS');",
                [],
            )
            .expect("insert");

        let second = open_shared_memory("open-rs-shared").expect("second session");
        let count: i64 = second
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);

        let other = open_shared_memory("open-rs-other").expect("other session");
        let count: i64 = other
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn rejects_blank_and_foreign_schemes() {
        assert!(matches!(open_relational("  "), Err(DbError::InvalidUrl(_))));
        assert!(matches!(
            open_relational("postgresql://user@localhost/db"),
            Err(DbError::InvalidUrl(_))
        ));
    }
}
