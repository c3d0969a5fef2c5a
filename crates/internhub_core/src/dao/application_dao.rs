//! Relational accessor for applications.
//!
//! # Invariants
//! - `user_id` must reference an existing user; the foreign-key violation
//!   propagates as `DaoError::Db` untranslated.
//! - `opportunity_id` is stored as opaque text and is never checked against
//!   the document store here.
//! - `list_by_user` returns newest first.

use crate::dao::sql::Assignments;
use crate::dao::{ApplicationDao, DaoError, DaoResult, RecordDao};
use crate::model::application::{
    Application, ApplicationChanges, ApplicationId, ApplicationStatus, NewApplication,
};
use crate::model::ids::canonical_id;
use crate::model::user::UserId;
use log::info;
use rusqlite::{params, Connection, Row};

const APPLICATION_SELECT_SQL: &str =
    "SELECT id, user_id, opportunity_id, status, created_at FROM applications";

pub struct SqliteApplicationDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteApplicationDao<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_all(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> DaoResult<Vec<Application>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut applications = Vec::new();
        while let Some(row) = rows.next()? {
            applications.push(parse_application_row(row)?);
        }

        Ok(applications)
    }
}

impl RecordDao for SqliteApplicationDao<'_> {
    type Id = ApplicationId;
    type Record = Application;
    type NewRecord = NewApplication;
    type Changes = ApplicationChanges;
    type Created = Application;

    fn create(&self, fields: &NewApplication) -> DaoResult<Application> {
        fields.validate()?;

        self.conn.execute(
            "INSERT INTO applications (user_id, opportunity_id, status) VALUES (?1, ?2, ?3);",
            params![
                fields.user_id,
                canonical_id(&fields.opportunity_id),
                fields.status.as_str(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!(
            "event=application_create module=dao.application status=ok application_id={id} user_id={}",
            fields.user_id
        );
        self.get(&id)?.ok_or_else(|| {
            DaoError::InvalidData(format!("application {id} vanished after insert"))
        })
    }

    fn get(&self, id: &ApplicationId) -> DaoResult<Option<Application>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{APPLICATION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_application_row(row)?));
        }

        Ok(None)
    }

    fn get_all(&self) -> DaoResult<Vec<Application>> {
        self.query_all(&format!("{APPLICATION_SELECT_SQL} ORDER BY id ASC;"), &[])
    }

    fn update(&self, id: &ApplicationId, changes: &ApplicationChanges) -> DaoResult<bool> {
        changes.validate()?;

        let mut assignments = Assignments::new();
        assignments.text("status", changes.status.map(ApplicationStatus::as_str));
        assignments.text("opportunity_id", changes.opportunity_id.as_deref());
        assignments.apply(self.conn, "applications", *id)
    }

    fn delete(&self, id: &ApplicationId) -> DaoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM applications WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

impl ApplicationDao for SqliteApplicationDao<'_> {
    fn list_by_user(&self, user_id: UserId) -> DaoResult<Vec<Application>> {
        self.query_all(
            &format!(
                "{APPLICATION_SELECT_SQL}
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC;"
            ),
            &[&user_id],
        )
    }
}

fn parse_application_row(row: &Row<'_>) -> DaoResult<Application> {
    let status_text: String = row.get("status")?;
    let status = ApplicationStatus::parse(&status_text).ok_or_else(|| {
        DaoError::InvalidData(format!(
            "invalid status `{status_text}` in applications.status"
        ))
    })?;

    Ok(Application {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        opportunity_id: row.get("opportunity_id")?,
        status,
        created_at: row.get("created_at")?,
    })
}
