//! Relational accessor for academic records.

use crate::dao::sql::{conflict_on_unique, Assignments};
use crate::dao::{DaoError, DaoResult, RecordDao, StudentDao};
use crate::db::DbError;
use crate::model::student::{NewStudent, Student, StudentChanges, StudentId};
use log::info;
use rusqlite::{params, Connection, Row};

const STUDENT_SELECT_SQL: &str = "SELECT id, name, email, gpa, department FROM students";

pub struct SqliteStudentDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentDao<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RecordDao for SqliteStudentDao<'_> {
    type Id = StudentId;
    type Record = Student;
    type NewRecord = NewStudent;
    type Changes = StudentChanges;
    type Created = Student;

    fn create(&self, fields: &NewStudent) -> DaoResult<Student> {
        fields.validate()?;
        let email = fields.email.trim();

        self.conn
            .execute(
                "INSERT INTO students (name, email, gpa, department) VALUES (?1, ?2, ?3, ?4);",
                params![fields.name.trim(), email, fields.gpa, fields.department.trim()],
            )
            .map_err(|err| {
                conflict_on_unique(err, || format!("student email `{email}` is already registered"))
            })?;

        let id = self.conn.last_insert_rowid();
        info!("event=student_create module=dao.student status=ok student_id={id}");
        self.get(&id)?
            .ok_or_else(|| DaoError::InvalidData(format!("student {id} vanished after insert")))
    }

    fn get(&self, id: &StudentId) -> DaoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }

        Ok(None)
    }

    fn get_all(&self) -> DaoResult<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        Ok(students)
    }

    fn update(&self, id: &StudentId, changes: &StudentChanges) -> DaoResult<bool> {
        changes.validate()?;

        let mut assignments = Assignments::new();
        assignments.text("name", changes.name.as_deref());
        assignments.text("email", changes.email.as_deref());
        assignments.real("gpa", changes.gpa);
        assignments.text("department", changes.department.as_deref());

        assignments
            .apply(self.conn, "students", *id)
            .map_err(|err| match err {
                DaoError::Db(DbError::Sqlite(inner)) => conflict_on_unique(inner, || {
                    format!(
                        "student email `{}` is already registered",
                        changes.email.as_deref().unwrap_or_default().trim()
                    )
                }),
                other => other,
            })
    }

    fn delete(&self, id: &StudentId) -> DaoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

impl StudentDao for SqliteStudentDao<'_> {}

fn parse_student_row(row: &Row<'_>) -> DaoResult<Student> {
    Ok(Student {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        gpa: row.get("gpa")?,
        department: row.get("department")?,
    })
}
