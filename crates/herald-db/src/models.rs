/// Database row types — these map directly to SQLite rows.
/// Distinct from herald-types models to keep the DB layer independent.

pub struct ApplicationRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub token: String,
}

pub struct MessageRow {
    pub id: i64,
    pub application_id: i64,
    pub title: String,
    pub message: String,
    pub priority: i32,
    /// JSON object, stored as text.
    pub extras: Option<String>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}
