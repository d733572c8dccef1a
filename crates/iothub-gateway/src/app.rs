use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use iothub_auth::{AuthService, SessionManager, UserStore};
use iothub_core::config::HubConfig;
use iothub_core::{Clock, HubError};
use iothub_registry::ResourceRegistry;
use tracing::info;

use crate::db::connect;
use crate::http;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: HubConfig,
    pub auth: AuthService,
    pub registry: ResourceRegistry,
}

impl AppState {
    pub fn new(config: HubConfig, auth: AuthService, registry: ResourceRegistry) -> Self {
        Self {
            config,
            auth,
            registry,
        }
    }

    /// Build every subsystem against the configured database file.
    ///
    /// Each subsystem gets its own connection. Fails when no token secret
    /// is configured.
    pub fn open(config: HubConfig, clock: Arc<dyn Clock>) -> Result<Self, HubError> {
        let secret = config
            .auth
            .jwt_secret
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                HubError::Config(
                    "auth.jwt_secret is not set (use IOTHUB_AUTH__JWT_SECRET)".to_string(),
                )
            })?;

        let path = config.database.path.clone();
        let open = |what: &str| {
            connect(&path).map_err(|e| HubError::Internal(format!("opening {what} db: {e}")))
        };

        let users =
            UserStore::new(open("users")?).map_err(|e| HubError::Internal(e.to_string()))?;
        let sessions = Arc::new(SessionManager::new(secret, clock));
        let registry = ResourceRegistry::new(open("registry")?, config.registry.clone())
            .map_err(|e| HubError::Internal(e.to_string()))?;
        info!(path = %path, "subsystems ready");

        Ok(Self::new(config, AuthService::new(users, sessions), registry))
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::health::welcome))
        .route("/health", get(http::health::health_handler))
        .route("/api/user/signup", post(http::user::signup))
        .route("/api/user/login", post(http::user::login))
        .route("/api/device/add", post(http::device::add_device))
        .route("/api/device/list", get(http::device::list_devices))
        .route("/api/device/delete", delete(http::device::delete_device))
        .route("/api/schedule/set", post(http::schedule::set_schedule))
        .route("/api/schedule/list", get(http::schedule::list_schedules))
        .route("/api/schedule/delete", delete(http::schedule::delete_schedule))
        .route("/api/schedule/toggle", post(http::schedule::toggle_schedule))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
