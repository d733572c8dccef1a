use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode};
use tracing::{debug, instrument};

use crate::db::init_db;
use crate::error::{AuthError, Result};

/// Persistence for user credentials.
///
/// Wraps a single SQLite connection in a `Mutex`; every operation is one
/// statement, so the store is the only source of atomicity.
pub struct UserStore {
    db: Mutex<Connection>,
}

impl UserStore {
    /// Take ownership of `conn`, creating the users table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Insert a new user. A duplicate email maps to `AlreadyExists` via the
    /// primary-key constraint rather than a prior lookup.
    #[instrument(skip(self, password_hash))]
    pub fn create(&self, email: &str, password_hash: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.lock()?;
        match db.execute(
            "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![email, password_hash, now],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(AuthError::AlreadyExists)
            }
            Err(e) => Err(AuthError::Database(e)),
        }
    }

    /// Stored hash for `email`, or `None` when the user does not exist.
    #[instrument(skip(self))]
    pub fn password_hash(&self, email: &str) -> Result<Option<String>> {
        let db = self.lock()?;
        match db.query_row(
            "SELECT password_hash FROM users WHERE email = ?1",
            rusqlite::params![email],
            |row| row.get::<_, String>(0),
        ) {
            Ok(hash) => Ok(Some(hash)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                debug!("no such user");
                Ok(None)
            }
            Err(e) => Err(AuthError::Database(e)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| AuthError::Internal("user store lock poisoned".to_string()))
    }
}
