use rusqlite::{Connection, Result};

/// Initialise the devices and schedules tables in `conn`.
///
/// Foreign keys are switched on for this connection; schedule rows depend on
/// `ON DELETE CASCADE` to disappear with their device.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS devices (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email  TEXT    NOT NULL,
            name        TEXT    NOT NULL,
            device_key  TEXT    NOT NULL UNIQUE,
            created_at  TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_devices_owner ON devices (user_email);

        CREATE TABLE IF NOT EXISTS schedules (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email       TEXT    NOT NULL,
            device_id        INTEGER NOT NULL REFERENCES devices(id) ON DELETE CASCADE,
            cron_expression  TEXT    NOT NULL,
            action           TEXT    NOT NULL CHECK (action IN ('ON', 'OFF')),
            is_active        INTEGER NOT NULL DEFAULT 1,
            created_at       TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_schedules_owner  ON schedules (user_email);
        CREATE INDEX IF NOT EXISTS idx_schedules_device ON schedules (device_id);
        -- Matcher pass: SELECT … WHERE is_active = 1
        CREATE INDEX IF NOT EXISTS idx_schedules_active ON schedules (is_active);
        ",
    )
}
