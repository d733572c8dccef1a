use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Free-tier resource limits per owner.
pub const MAX_DEVICES: u32 = 5;
pub const MAX_SCHEDULES: u32 = 5;

/// Upper bound on a device display name, in characters.
pub const MAX_LABEL_LENGTH: usize = 50;
/// Upper bound on a single cron field, in characters.
pub const MAX_CRON_FIELD_LENGTH: usize = 10;

pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 10;

/// Top-level config (iothub.toml + IOTHUB_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for session tokens. The gateway refuses to start without it.
    pub jwt_secret: Option<String>,
    /// Mark the session cookie `Secure`. Only switch off for plain-HTTP local testing.
    #[serde(default = "bool_true")]
    pub secure_cookie: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            secure_cookie: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// How quota checks guard against concurrent creations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QuotaMode {
    /// Count, compare, insert as separate statements. Concurrent creations
    /// from one owner can overshoot the limit by the number of racers.
    #[default]
    BestEffort,
    /// Count and insert inside one IMMEDIATE transaction.
    Serialized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_max_devices")]
    pub max_devices: u32,
    #[serde(default = "default_max_schedules")]
    pub max_schedules: u32,
    #[serde(default)]
    pub quota_mode: QuotaMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_devices: MAX_DEVICES,
            max_schedules: MAX_SCHEDULES,
            quota_mode: QuotaMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// When false the matcher loop is not started (API-only node).
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Upper bound on a single dispatch call before it is abandoned.
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dispatch_timeout_secs: DEFAULT_DISPATCH_TIMEOUT_SECS,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_max_devices() -> u32 {
    MAX_DEVICES
}
fn default_max_schedules() -> u32 {
    MAX_SCHEDULES
}
fn default_dispatch_timeout() -> u64 {
    DEFAULT_DISPATCH_TIMEOUT_SECS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.iothub/iothub.db", home)
}

impl HubConfig {
    /// Load config from a TOML file with IOTHUB_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `IOTHUB_AUTH__JWT_SECRET`.
    /// A missing file is not an error; every field has a default except the
    /// token secret, which the gateway checks separately.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: HubConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("IOTHUB_").split("__"))
            .extract()
            .map_err(|e| crate::error::HubError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.iothub/iothub.toml", home)
}
