use rusqlite::{Connection, Result};

/// Initialise the users table. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            email          TEXT PRIMARY KEY NOT NULL,
            password_hash  TEXT NOT NULL,   -- base64(salt || pbkdf2 key)
            created_at     TEXT NOT NULL
        );",
    )
}
