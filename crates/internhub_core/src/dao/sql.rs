//! SQL helpers shared by the relational accessors.

use crate::dao::{DaoError, DaoResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Column assignments collected from a partial-update value.
#[derive(Debug, Default)]
pub(crate) struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn text(&mut self, column: &'static str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(column, Value::Text(value.trim().to_string()));
        }
    }

    pub(crate) fn real(&mut self, column: &'static str, value: Option<f64>) {
        if let Some(value) = value {
            self.push(column, Value::Real(value));
        }
    }

    fn push(&mut self, column: &'static str, value: Value) {
        self.columns.push(column);
        self.values.push(value);
    }

    /// Applies the assignments to the row with `id` in `table`.
    ///
    /// Returns whether the row exists. An empty assignment set only checks
    /// existence, so "matched" semantics hold even when nothing is written.
    pub(crate) fn apply(self, conn: &Connection, table: &'static str, id: i64) -> DaoResult<bool> {
        if self.columns.is_empty() {
            let exists: i64 = conn.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
                [id],
                |row| row.get(0),
            )?;
            return Ok(exists == 1);
        }

        let set_clause = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let id_index = self.columns.len() + 1;
        let sql = format!("UPDATE {table} SET {set_clause} WHERE id = ?{id_index};");

        let mut bind_values = self.values;
        bind_values.push(Value::Integer(id));
        let changed = conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed > 0)
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Maps a unique-constraint violation to `Conflict`; other errors pass through.
pub(crate) fn conflict_on_unique(err: rusqlite::Error, message: impl FnOnce() -> String) -> DaoError {
    if is_unique_violation(&err) {
        DaoError::Conflict(message())
    } else {
        DaoError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_unique_violation, Assignments};
    use rusqlite::Connection;

    fn scratch() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT UNIQUE, score REAL);
             INSERT INTO items (id, label, score) VALUES (1, 'a', 1.0), (2, 'b', 2.0);",
        )
        .expect("schema");
        conn
    }

    #[test]
    fn empty_assignments_report_existence_only() {
        let conn = scratch();
        assert!(Assignments::new().apply(&conn, "items", 1).expect("apply"));
        assert!(!Assignments::new().apply(&conn, "items", 99).expect("apply"));
    }

    #[test]
    fn assignments_bind_in_column_order() {
        let conn = scratch();
        let mut assignments = Assignments::new();
        assignments.text("label", Some(" renamed "));
        assignments.real("score", Some(9.5));
        assignments.real("unused", None);
        assert!(assignments.apply(&conn, "items", 2).expect("apply"));

        let (label, score): (String, f64) = conn
            .query_row("SELECT label, score FROM items WHERE id = 2", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("row");
        assert_eq!(label, "renamed");
        assert_eq!(score, 9.5);
    }

    #[test]
    fn duplicate_label_is_recognised_as_unique_violation() {
        let conn = scratch();
        let mut assignments = Assignments::new();
        assignments.text("label", Some("a"));
        let err = match assignments.apply(&conn, "items", 2) {
            Err(crate::dao::DaoError::Db(crate::db::DbError::Sqlite(err))) => err,
            other => panic!("expected sqlite error, got {other:?}"),
        };
        assert!(is_unique_violation(&err));
    }
}
