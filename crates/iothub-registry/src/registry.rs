use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use iothub_core::config::{QuotaMode, RegistryConfig, MAX_LABEL_LENGTH};
use iothub_core::{Action, CronExpr, Owner};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use tracing::{info, instrument, warn};

use crate::db::init_db;
use crate::error::{RegistryError, Result};
use crate::types::{ActiveSchedule, Device, ScheduleView};

const DUPLICATE_KEY: &str = "This unique device key is already registered.";

/// Quota-enforced storage for devices and their schedules.
///
/// Every owner-facing operation filters on the owner's email inside the SQL
/// predicate, so a row belonging to another tenant behaves exactly like a
/// row that does not exist.
pub struct ResourceRegistry {
    db: Mutex<Connection>,
    config: RegistryConfig,
}

impl ResourceRegistry {
    pub fn new(conn: Connection, config: RegistryConfig) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
            config,
        })
    }

    // ── Devices ─────────────────────────────────────────────────────────────

    /// Register a device and return the owner's device count after insert.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub fn add_device(&self, owner: &Owner, name: &str, device_key: &str) -> Result<u32> {
        let name = name.trim();
        let device_key = device_key.trim();
        if name.is_empty() || device_key.is_empty() {
            return Err(RegistryError::Validation(
                "Device name and key are required.".to_string(),
            ));
        }
        if name.chars().count() > MAX_LABEL_LENGTH {
            return Err(RegistryError::Validation(format!(
                "Device name cannot exceed {MAX_LABEL_LENGTH} characters."
            )));
        }

        let limit = self.config.max_devices;
        let mut db = self.lock()?;
        let count = match self.config.quota_mode {
            QuotaMode::BestEffort => insert_device(&db, owner, name, device_key, limit)?,
            QuotaMode::Serialized => {
                let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let count = insert_device(&tx, owner, name, device_key, limit)?;
                tx.commit()?;
                count
            }
        };

        info!(device_key, current = count, "device registered");
        Ok(count)
    }

    /// The owner's devices, newest first.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub fn list_devices(&self, owner: &Owner) -> Result<Vec<Device>> {
        let db = self.lock()?;
        let mut stmt = db.prepare_cached(
            "SELECT id, name, device_key, created_at FROM devices
             WHERE user_email = ?1 ORDER BY id DESC",
        )?;
        let devices = stmt
            .query_map([owner.as_str()], |row| {
                Ok(Device {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    device_key: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(devices)
    }

    /// Delete one of the owner's devices. Its schedules go with it.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub fn delete_device(&self, owner: &Owner, device_id: i64) -> Result<()> {
        let db = self.lock()?;
        let n = db.execute(
            "DELETE FROM devices WHERE id = ?1 AND user_email = ?2",
            rusqlite::params![device_id, owner.as_str()],
        )?;
        if n == 0 {
            return Err(RegistryError::NotFound("Device not found.".to_string()));
        }
        info!(device_id, "device deleted");
        Ok(())
    }

    pub fn count_devices(&self, owner: &Owner) -> Result<u32> {
        let db = self.lock()?;
        Ok(count_devices(&db, owner)?)
    }

    // ── Schedules ───────────────────────────────────────────────────────────

    /// Attach an active schedule to one of the owner's devices and return the
    /// owner's schedule count after insert.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub fn add_schedule(
        &self,
        owner: &Owner,
        device_id: i64,
        cron_expression: &str,
        action: &str,
    ) -> Result<u32> {
        let cron_expression = cron_expression.trim();
        if cron_expression.is_empty() || action.is_empty() {
            return Err(RegistryError::Validation(
                "Missing device_id, cron_expression, or action.".to_string(),
            ));
        }
        let action: Action = action.parse().map_err(|_| {
            RegistryError::Validation("Action must be \"ON\" or \"OFF\".".to_string())
        })?;
        CronExpr::parse(cron_expression).map_err(|e| RegistryError::Validation(e.to_string()))?;

        let limit = self.config.max_schedules;
        let mut db = self.lock()?;
        let count = match self.config.quota_mode {
            QuotaMode::BestEffort => {
                insert_schedule(&db, owner, device_id, cron_expression, action, limit)?
            }
            QuotaMode::Serialized => {
                let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let count = insert_schedule(&tx, owner, device_id, cron_expression, action, limit)?;
                tx.commit()?;
                count
            }
        };

        info!(device_id, cron = cron_expression, %action, current = count, "schedule set");
        Ok(count)
    }

    /// The owner's schedules with their device names, newest first.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub fn list_schedules(&self, owner: &Owner) -> Result<Vec<ScheduleView>> {
        let db = self.lock()?;
        let mut stmt = db.prepare_cached(
            "SELECT s.id, s.device_id, d.name, s.cron_expression, s.action,
                    s.is_active, s.created_at
             FROM schedules s JOIN devices d ON d.id = s.device_id
             WHERE s.user_email = ?1
             ORDER BY s.id DESC",
        )?;
        let schedules = stmt
            .query_map([owner.as_str()], |row| {
                Ok(ScheduleView {
                    id: row.get(0)?,
                    device_id: row.get(1)?,
                    device_name: row.get(2)?,
                    cron_expression: row.get(3)?,
                    action: action_at(row, 4)?,
                    is_active: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub fn delete_schedule(&self, owner: &Owner, schedule_id: i64) -> Result<()> {
        let db = self.lock()?;
        let n = db.execute(
            "DELETE FROM schedules WHERE id = ?1 AND user_email = ?2",
            rusqlite::params![schedule_id, owner.as_str()],
        )?;
        if n == 0 {
            return Err(RegistryError::NotFound("Schedule not found.".to_string()));
        }
        info!(schedule_id, "schedule deleted");
        Ok(())
    }

    /// Enable or disable one of the owner's schedules.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub fn toggle_schedule(&self, owner: &Owner, schedule_id: i64, active: bool) -> Result<()> {
        let db = self.lock()?;
        let n = db.execute(
            "UPDATE schedules SET is_active = ?1 WHERE id = ?2 AND user_email = ?3",
            rusqlite::params![active, schedule_id, owner.as_str()],
        )?;
        if n == 0 {
            return Err(RegistryError::NotFound("Schedule not found.".to_string()));
        }
        info!(schedule_id, active, "schedule toggled");
        Ok(())
    }

    pub fn count_schedules(&self, owner: &Owner) -> Result<u32> {
        let db = self.lock()?;
        Ok(count_schedules(&db, owner)?)
    }

    /// Every enabled schedule across all owners, joined to its device key.
    #[instrument(skip(self))]
    pub fn active_schedules(&self) -> Result<Vec<ActiveSchedule>> {
        let db = self.lock()?;
        let mut stmt = db.prepare_cached(
            "SELECT s.id, s.device_id, d.device_key, s.cron_expression, s.action
             FROM schedules s JOIN devices d ON d.id = s.device_id
             WHERE s.is_active = 1
             ORDER BY s.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ActiveSchedule {
                    schedule_id: row.get(0)?,
                    device_id: row.get(1)?,
                    device_key: row.get(2)?,
                    cron_expression: row.get(3)?,
                    action: action_at(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| RegistryError::Internal("registry lock poisoned".to_string()))
    }
}

// --- statement helpers, shared by both quota modes ---------------------------

fn insert_device(
    conn: &Connection,
    owner: &Owner,
    name: &str,
    device_key: &str,
    limit: u32,
) -> Result<u32> {
    let count = count_devices(conn, owner)?;
    if count >= limit {
        warn!(current = count, limit, "device quota reached");
        return Err(RegistryError::QuotaExceeded {
            action: "register",
            resource: "devices",
            limit,
        });
    }

    let now = Utc::now().to_rfc3339();
    match conn.execute(
        "INSERT INTO devices (user_email, name, device_key, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![owner.as_str(), name, device_key, now],
    ) {
        Ok(_) => Ok(count + 1),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(RegistryError::Conflict(DUPLICATE_KEY.to_string()))
        }
        Err(e) => Err(RegistryError::Database(e)),
    }
}

fn insert_schedule(
    conn: &Connection,
    owner: &Owner,
    device_id: i64,
    cron_expression: &str,
    action: Action,
    limit: u32,
) -> Result<u32> {
    let count = count_schedules(conn, owner)?;
    if count >= limit {
        warn!(current = count, limit, "schedule quota reached");
        return Err(RegistryError::QuotaExceeded {
            action: "set",
            resource: "schedules",
            limit,
        });
    }

    let owned = conn
        .query_row(
            "SELECT 1 FROM devices WHERE id = ?1 AND user_email = ?2",
            rusqlite::params![device_id, owner.as_str()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !owned {
        warn!(device_id, "schedule rejected: device not owned");
        return Err(RegistryError::DeviceNotOwned);
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO schedules (user_email, device_id, cron_expression, action, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        rusqlite::params![owner.as_str(), device_id, cron_expression, action.as_str(), now],
    )?;
    Ok(count + 1)
}

fn count_devices(conn: &Connection, owner: &Owner) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM devices WHERE user_email = ?1",
        [owner.as_str()],
        |row| row.get(0),
    )
}

fn count_schedules(conn: &Connection, owner: &Owner) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM schedules WHERE user_email = ?1",
        [owner.as_str()],
        |row| row.get(0),
    )
}

fn action_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Action> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new(
            Connection::open_in_memory().unwrap(),
            RegistryConfig::default(),
        )
        .unwrap()
    }

    fn alice() -> Owner {
        Owner::new("alice@x.com")
    }

    fn bob() -> Owner {
        Owner::new("bob@x.com")
    }

    fn device_id(reg: &ResourceRegistry, owner: &Owner, key: &str) -> i64 {
        reg.list_devices(owner)
            .unwrap()
            .into_iter()
            .find(|d| d.device_key == key)
            .map(|d| d.id)
            .unwrap()
    }

    #[test]
    fn add_device_returns_running_count() {
        let reg = registry();
        assert_eq!(reg.add_device(&alice(), "Lamp", "k1").unwrap(), 1);
        assert_eq!(reg.add_device(&alice(), "Fan", "k2").unwrap(), 2);
        assert_eq!(reg.add_device(&bob(), "Heater", "k3").unwrap(), 1);
    }

    #[test]
    fn sixth_device_is_rejected_and_count_stays_at_limit() {
        let reg = registry();
        for i in 0..5 {
            reg.add_device(&alice(), &format!("d{i}"), &format!("key-{i}"))
                .unwrap();
        }
        let err = reg.add_device(&alice(), "extra", "key-extra").unwrap_err();
        assert!(matches!(
            err,
            RegistryError::QuotaExceeded { limit: 5, resource: "devices", .. }
        ));
        assert_eq!(
            err.to_string(),
            "Limit reached: Free Tier users can register a maximum of 5 devices."
        );
        assert_eq!(reg.count_devices(&alice()).unwrap(), 5);
    }

    #[test]
    fn device_validation() {
        let reg = registry();
        assert!(matches!(
            reg.add_device(&alice(), "", "k"),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            reg.add_device(&alice(), "Lamp", "  "),
            Err(RegistryError::Validation(_))
        ));
        let long = "x".repeat(51);
        let err = reg.add_device(&alice(), &long, "k").unwrap_err();
        assert_eq!(err.to_string(), "Device name cannot exceed 50 characters.");
        // Exactly at the limit is fine.
        reg.add_device(&alice(), &"x".repeat(50), "k").unwrap();
    }

    #[test]
    fn device_key_is_globally_unique() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "shared").unwrap();
        let err = reg.add_device(&bob(), "Lamp", "shared").unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(_)));
        assert_eq!(reg.count_devices(&bob()).unwrap(), 0);
    }

    #[test]
    fn list_devices_is_owner_scoped_newest_first() {
        let reg = registry();
        reg.add_device(&alice(), "first", "a1").unwrap();
        reg.add_device(&bob(), "other", "b1").unwrap();
        reg.add_device(&alice(), "second", "a2").unwrap();

        let names: Vec<_> = reg
            .list_devices(&alice())
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn delete_device_cascades_to_schedules() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");
        reg.add_schedule(&alice(), id, "0 7", "ON").unwrap();
        reg.add_schedule(&alice(), id, "0 22", "OFF").unwrap();
        assert_eq!(reg.active_schedules().unwrap().len(), 2);

        reg.delete_device(&alice(), id).unwrap();
        assert_eq!(reg.count_schedules(&alice()).unwrap(), 0);
        assert!(reg.active_schedules().unwrap().is_empty());
    }

    #[test]
    fn delete_device_of_other_owner_is_not_found() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");
        assert!(matches!(
            reg.delete_device(&bob(), id),
            Err(RegistryError::NotFound(_))
        ));
        assert_eq!(reg.count_devices(&alice()).unwrap(), 1);
    }

    #[test]
    fn schedule_on_foreign_device_is_rejected_without_insert() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");

        let err = reg.add_schedule(&bob(), id, "0 10 * * *", "ON").unwrap_err();
        assert!(matches!(err, RegistryError::DeviceNotOwned));
        assert_eq!(reg.count_schedules(&bob()).unwrap(), 0);

        // Non-existent device looks the same.
        assert!(matches!(
            reg.add_schedule(&bob(), 9999, "0 10", "ON"),
            Err(RegistryError::DeviceNotOwned)
        ));
    }

    #[test]
    fn schedule_validation() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");

        let err = reg.add_schedule(&alice(), id, "0 10", "on").unwrap_err();
        assert_eq!(err.to_string(), "Action must be \"ON\" or \"OFF\".");
        assert!(matches!(
            reg.add_schedule(&alice(), id, "*/5 * * * *", "ON"),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            reg.add_schedule(&alice(), id, "", "ON"),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn sixth_schedule_is_rejected() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");
        for h in 0..5 {
            assert_eq!(
                reg.add_schedule(&alice(), id, &format!("0 {h}"), "ON").unwrap(),
                h + 1
            );
        }
        let err = reg.add_schedule(&alice(), id, "0 6", "OFF").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Limit reached: Free Tier users can set a maximum of 5 schedules."
        );
        assert_eq!(reg.count_schedules(&alice()).unwrap(), 5);
    }

    #[test]
    fn list_schedules_carries_device_name() {
        let reg = registry();
        reg.add_device(&alice(), "Porch light", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");
        reg.add_schedule(&alice(), id, "30 18 * * *", "ON").unwrap();

        let list = reg.list_schedules(&alice()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].device_name, "Porch light");
        assert_eq!(list[0].action, Action::On);
        assert!(list[0].is_active);
        assert!(reg.list_schedules(&bob()).unwrap().is_empty());
    }

    #[test]
    fn toggle_removes_from_active_set() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");
        reg.add_schedule(&alice(), id, "0 10", "ON").unwrap();
        let sid = reg.list_schedules(&alice()).unwrap()[0].id;

        reg.toggle_schedule(&alice(), sid, false).unwrap();
        assert!(reg.active_schedules().unwrap().is_empty());
        assert!(!reg.list_schedules(&alice()).unwrap()[0].is_active);

        assert!(matches!(
            reg.toggle_schedule(&bob(), sid, true),
            Err(RegistryError::NotFound(_))
        ));
        reg.toggle_schedule(&alice(), sid, true).unwrap();
        let active = reg.active_schedules().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].device_key, "k1");
    }

    #[test]
    fn delete_schedule_is_owner_scoped() {
        let reg = registry();
        reg.add_device(&alice(), "Lamp", "k1").unwrap();
        let id = device_id(&reg, &alice(), "k1");
        reg.add_schedule(&alice(), id, "0 10", "ON").unwrap();
        let sid = reg.list_schedules(&alice()).unwrap()[0].id;

        assert!(matches!(
            reg.delete_schedule(&bob(), sid),
            Err(RegistryError::NotFound(_))
        ));
        reg.delete_schedule(&alice(), sid).unwrap();
        assert!(matches!(
            reg.delete_schedule(&alice(), sid),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn serialized_mode_holds_quota_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.db");
        let config = RegistryConfig {
            quota_mode: QuotaMode::Serialized,
            ..RegistryConfig::default()
        };
        let a = ResourceRegistry::new(Connection::open(&path).unwrap(), config.clone()).unwrap();
        let b = ResourceRegistry::new(Connection::open(&path).unwrap(), config).unwrap();

        let owner = alice();
        let ok = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let reg = if i % 2 == 0 { &a } else { &b };
                    let owner = &owner;
                    s.spawn(move || reg.add_device(owner, "d", &format!("key-{i}")).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(ok, 5);
        assert_eq!(a.count_devices(&owner).unwrap(), 5);
    }
}
