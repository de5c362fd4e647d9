//! Application state wiring all services together.
//!
//! AppState holds the concrete instances used by the HTTP and WebSocket
//! handlers. The delivery router is generic over the repository trait, but
//! AppState pins it to the SQLite implementation.

use std::path::PathBuf;
use std::sync::Arc;

use parlor_core::conversation::GroupTable;
use parlor_core::delivery::DeliveryRouter;
use parlor_core::presence::PresenceRegistry;
use parlor_infra::config::{load_server_config, resolve_data_dir};
use parlor_infra::sqlite::message::SqliteMessageRepository;
use parlor_infra::sqlite::pool::DatabasePool;
use parlor_types::config::ServerConfig;

/// Concrete type alias for the router generic pinned to the SQLite repo.
pub type ConcreteDeliveryRouter = DeliveryRouter<SqliteMessageRepository>;

/// Shared application state for every connection task and HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConcreteDeliveryRouter>,
    pub presence: Arc<PresenceRegistry>,
    pub groups: Arc<GroupTable>,
    /// Separate repository instance for the HTTP read endpoint (the router
    /// owns its own; pools are shared underneath).
    pub messages: Arc<SqliteMessageRepository>,
    pub config: ServerConfig,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, wire the realtime
    /// core.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_server_config(&data_dir).await;

        // Initialize database
        let db_url = format!("sqlite://{}?mode=rwc", data_dir.join("parlor.db").display());
        let db_pool = DatabasePool::new(&db_url).await?;

        // Presence and group membership are process-scoped: they reflect
        // live sockets only and start empty on every boot.
        let presence = Arc::new(PresenceRegistry::new());
        let groups = Arc::new(GroupTable::new());

        let router = DeliveryRouter::new(
            SqliteMessageRepository::new(db_pool.clone()),
            presence.clone(),
            groups.clone(),
            config.history_window,
        );

        let messages = Arc::new(SqliteMessageRepository::new(db_pool.clone()));

        Ok(Self {
            router: Arc::new(router),
            presence,
            groups,
            messages,
            config,
            data_dir,
            db_pool,
        })
    }
}
