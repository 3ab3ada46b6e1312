use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (applications, messages)");
        // AUTOINCREMENT keeps message ids from ever being reused after a delete;
        // the pagination cursor depends on it.
        conn.execute_batch(
            "
            CREATE TABLE applications (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL,
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                token       TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_applications_user
                ON applications(user_id);

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                application_id  INTEGER NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                message         TEXT NOT NULL,
                priority        INTEGER NOT NULL DEFAULT 0,
                extras          TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_application
                ON messages(application_id, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
