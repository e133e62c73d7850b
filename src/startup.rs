//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::domain::{IdentityResolver, PresenceStore};
use crate::infrastructure::database;
use crate::infrastructure::push::FcmNotifier;
use crate::infrastructure::repositories::{
    PgMessageStore, PgReadReceiptStore, PgRoomDirectory, PgUserDirectory,
};
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{
    MessageDispatcher, PresenceRegistry, ReadReceiptTracker, RoomHub, RoomService, TypingNotifier,
};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub settings: Arc<Settings>,
    pub hub: Arc<RoomHub>,
    pub presence: Arc<PresenceRegistry>,
    pub identity: Arc<dyn IdentityResolver>,
    pub presence_store: Arc<dyn PresenceStore>,
    pub room_service: Arc<RoomService>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub receipts: Arc<ReadReceiptTracker>,
    pub typing: Arc<TypingNotifier>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        // Create snowflake generator
        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
        ));

        // Storage collaborators
        let users = Arc::new(PgUserDirectory::new(db.clone(), settings.jwt.secret.clone()));
        let rooms = Arc::new(PgRoomDirectory::new(db.clone()));
        let messages = Arc::new(PgMessageStore::new(db.clone(), snowflake));
        let receipt_store = Arc::new(PgReadReceiptStore::new(db.clone()));
        let notifier = FcmNotifier::spawn(settings.push.clone(), db.clone());

        // Realtime core
        let hub = Arc::new(RoomHub::new());
        let presence = Arc::new(PresenceRegistry::new());
        let room_service = Arc::new(RoomService::new(
            hub.clone(),
            rooms.clone(),
            messages.clone(),
            settings.websocket.backlog_limit,
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(
            hub.clone(),
            presence.clone(),
            rooms.clone(),
            messages.clone(),
            notifier,
        ));
        let receipts = Arc::new(ReadReceiptTracker::new(
            hub.clone(),
            messages.clone(),
            receipt_store,
        ));
        let typing = Arc::new(TypingNotifier::new(hub.clone()));

        // Create app state
        let state = AppState {
            db,
            settings: Arc::new(settings.clone()),
            hub,
            presence,
            identity: users.clone(),
            presence_store: users,
            room_service,
            dispatcher,
            receipts,
            typing,
        };

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer());

        // Bind to address
        let addr = settings.server.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
