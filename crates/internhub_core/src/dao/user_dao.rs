//! Relational accessor for platform accounts.
//!
//! # Invariants
//! - Emails are unique; a duplicate surfaces as `DaoError::Conflict`.
//! - The stored digest is read only inside `validate_login` and never leaves
//!   this module.
//! - Login verification always performs exactly one digest comparison, so an
//!   unknown email costs the same as a wrong secret.

use crate::dao::sql::{conflict_on_unique, Assignments};
use crate::dao::{DaoError, DaoResult, RecordDao, UserDao};
use crate::db::DbError;
use crate::model::user::{NewUser, Role, User, UserChanges, UserId};
use crate::secrets::SecretHasher;
use log::{info, warn};
use rusqlite::{params, Connection, Row};
use std::sync::Arc;

const USER_SELECT_SQL: &str = "SELECT id, email, name, role FROM users";

pub struct SqliteUserDao<'conn> {
    conn: &'conn Connection,
    hasher: Arc<dyn SecretHasher>,
}

impl<'conn> SqliteUserDao<'conn> {
    pub fn new(conn: &'conn Connection, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { conn, hasher }
    }
}

impl RecordDao for SqliteUserDao<'_> {
    type Id = UserId;
    type Record = User;
    type NewRecord = NewUser;
    type Changes = UserChanges;
    type Created = User;

    fn create(&self, fields: &NewUser) -> DaoResult<User> {
        fields.validate()?;
        let email = fields.email.trim();

        self.conn
            .execute(
                "INSERT INTO users (email, password_hash, name, role) VALUES (?1, ?2, ?3, ?4);",
                params![
                    email,
                    fields.password_hash.as_str(),
                    fields.name.trim(),
                    fields.role.as_str(),
                ],
            )
            .map_err(|err| conflict_on_unique(err, || format!("email `{email}` is already registered")))?;

        let id = self.conn.last_insert_rowid();
        info!("event=user_create module=dao.user status=ok user_id={id}");
        self.get(&id)?
            .ok_or_else(|| DaoError::InvalidData(format!("user {id} vanished after insert")))
    }

    fn get(&self, id: &UserId) -> DaoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn get_all(&self) -> DaoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }

    fn update(&self, id: &UserId, changes: &UserChanges) -> DaoResult<bool> {
        changes.validate()?;

        let mut assignments = Assignments::new();
        assignments.text("email", changes.email.as_deref());
        assignments.text("password_hash", changes.password_hash.as_deref());
        assignments.text("name", changes.name.as_deref());
        assignments.text("role", changes.role.map(Role::as_str));

        assignments.apply(self.conn, "users", *id).map_err(|err| match err {
            DaoError::Db(DbError::Sqlite(inner)) => conflict_on_unique(inner, || {
                format!(
                    "email `{}` is already registered",
                    changes.email.as_deref().unwrap_or_default().trim()
                )
            }),
            other => other,
        })
    }

    fn delete(&self, id: &UserId) -> DaoResult<bool> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

impl UserDao for SqliteUserDao<'_> {
    fn find_by_email(&self, email: &str) -> DaoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn validate_login(&self, email: &str, plaintext: &str) -> DaoResult<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, name, role, password_hash FROM users WHERE email = ?1;",
        )?;
        let mut rows = stmt.query([email.trim()])?;
        let candidate = match rows.next()? {
            Some(row) => Some((parse_user_row(row)?, row.get::<_, String>("password_hash")?)),
            None => None,
        };

        let user = match candidate {
            Some((user, digest)) => self.hasher.verify(&digest, plaintext).then_some(user),
            None => {
                // Burn the same verification cost as a real account.
                let _ = self.hasher.verify(self.hasher.decoy_digest(), plaintext);
                None
            }
        };

        match &user {
            Some(found) => info!("event=login module=dao.user status=ok user_id={}", found.id),
            None => warn!("event=login module=dao.user status=rejected"),
        }
        Ok(user)
    }
}

fn parse_user_row(row: &Row<'_>) -> DaoResult<User> {
    let role_text: String = row.get("role")?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        DaoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        role,
    })
}
