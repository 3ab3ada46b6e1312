use crate::Database;
use crate::models::{ApplicationRow, MessageRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

/// SQLite treats a negative LIMIT as "no limit".
const NO_LIMIT: i64 = -1;

const MESSAGE_COLUMNS: &str =
    "m.id, m.application_id, m.title, m.message, m.priority, m.extras, m.created_at";

const APPLICATION_COLUMNS: &str = "id, user_id, name, description, token";

/// Which messages a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum MessageFilter {
    Application(i64),
    User(i64),
}

impl Database {
    // -- Applications --

    pub fn create_application(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
        token: &str,
    ) -> Result<ApplicationRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO applications (user_id, name, description, token) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, name, description, token],
            )?;
            Ok(ApplicationRow {
                id: conn.last_insert_rowid(),
                user_id,
                name: name.to_string(),
                description: description.to_string(),
                token: token.to_string(),
            })
        })
    }

    pub fn get_application_by_id(&self, id: i64) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1");
            conn.query_row(&sql, [id], application_from_row).optional()
        })
    }

    pub fn get_application_by_token(&self, token: &str) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE token = ?1");
            conn.query_row(&sql, [token], application_from_row).optional()
        })
    }

    // -- Messages --

    /// Inserts a message and returns its id.
    pub fn insert_message(
        &self,
        application_id: i64,
        title: &str,
        message: &str,
        priority: i32,
        extras: Option<&str>,
        created_at: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (application_id, title, message, priority, extras, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![application_id, title, message, priority, extras, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_message_by_id(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ?1");
            conn.query_row(&sql, [id], message_from_row).optional()
        })
    }

    /// Every message matching `filter`, newest first.
    pub fn get_messages(&self, filter: MessageFilter) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, filter, NO_LIMIT, 0))
    }

    /// Up to `limit` messages matching `filter` with an id below `since`
    /// (unbounded when `since` is 0), newest first.
    pub fn get_messages_since(&self, filter: MessageFilter, limit: usize, since: i64) -> Result<Vec<MessageRow>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(|conn| query_messages(conn, filter, limit, since))
    }

    pub fn delete_message_by_id(&self, id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])?))
    }

    pub fn delete_messages(&self, filter: MessageFilter) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = match filter {
                MessageFilter::Application(app_id) => {
                    conn.execute("DELETE FROM messages WHERE application_id = ?1", [app_id])?
                }
                MessageFilter::User(user_id) => conn.execute(
                    "DELETE FROM messages
                     WHERE application_id IN (SELECT id FROM applications WHERE user_id = ?1)",
                    [user_id],
                )?,
            };
            Ok(deleted)
        })
    }
}

fn query_messages(conn: &Connection, filter: MessageFilter, limit: i64, since: i64) -> Result<Vec<MessageRow>> {
    let (join, owner_column, owner_id) = match filter {
        MessageFilter::Application(app_id) => ("", "m.application_id", app_id),
        MessageFilter::User(user_id) => (
            "JOIN applications a ON a.id = m.application_id",
            "a.user_id",
            user_id,
        ),
    };

    let sql = format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages m {join}
         WHERE {owner_column} = ?1 AND (?2 = 0 OR m.id < ?2)
         ORDER BY m.id DESC
         LIMIT ?3"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![owner_id, since, limit], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        token: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        application_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        priority: row.get(4)?,
        extras: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
