use std::sync::Arc;

use color_eyre::eyre::Context;
use db::PgStore;
use pantry::{models::NewUser, MemoryStore, Store};
use tracing::instrument;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
}

impl AppConfig {
    #[instrument(name = "AppConfig::from_env")]
    pub fn from_env() -> crate::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(port) => port.parse().wrap_err("Invalid PORT, expected a port number")?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self { port })
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub store: Arc<dyn Store>,
    pub app: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("app", &self.app).finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, app: AppConfig) -> Self {
        Self { store, app }
    }

    #[instrument(name = "AppState::from_env", err)]
    pub async fn from_env(in_memory: bool) -> crate::Result<Self> {
        let store: Arc<dyn Store> = if in_memory {
            Arc::new(seeded_memory_store().await?)
        } else {
            Arc::new(PgStore::new(db::setup_db_pool().await?))
        };

        Ok(Self::new(store, AppConfig::from_env()?))
    }
}

/// An empty in-memory store has no way to issue a token, so it starts with
/// one staff account whose token is logged.
async fn seeded_memory_store() -> crate::Result<MemoryStore> {
    let store = MemoryStore::new();
    let (user, token) = pantry::users::register(
        &store,
        NewUser {
            email: "admin@localhost.localdomain".to_string(),
            username: "admin".to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            is_staff: true,
        },
    )
    .await?;

    tracing::warn!(
        username = %user.username,
        %token,
        "Serving from memory, nothing will be persisted"
    );

    Ok(store)
}
