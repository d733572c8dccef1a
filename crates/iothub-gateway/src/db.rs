use rusqlite::Connection;

/// Open `path` with the pragmas every subsystem connection needs.
///
/// Foreign keys are a per-connection setting in SQLite; without them the
/// schedule cascade on device delete silently does nothing.
pub fn connect(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Create the parent directory of the database file if it is missing.
pub fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_dir_is_created_for_nested_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data/hub/iothub.db");
        ensure_parent_dir(path.to_str().unwrap()).unwrap();
        assert!(tmp.path().join("data/hub").is_dir());
        connect(path.to_str().unwrap()).unwrap();
    }

    #[test]
    fn bare_file_name_needs_no_directory() {
        ensure_parent_dir("iothub.db").unwrap();
    }

    #[test]
    fn blocked_parent_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, b"").unwrap();
        let path = file.join("iothub.db");
        assert!(ensure_parent_dir(path.to_str().unwrap()).is_err());
    }
}
