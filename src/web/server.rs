//! Axum HTTP server hosting the coordinator API.

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tracing::info;

use crate::battles::BattleEngine;
use crate::config::WebConfig;
use crate::db::postgres::PgStore;
use crate::schedule::BattleScheduler;

use super::routes;

/// Shared state for all web routes.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<PgStore>,
    pub engine: Arc<BattleEngine<PgStore>>,
    pub scheduler: Arc<BattleScheduler<PgStore>>,
}

/// Axum web server for the coordinator API.
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    pub fn new(
        config: WebConfig,
        db: PgPool,
        store: Arc<PgStore>,
        engine: Arc<BattleEngine<PgStore>>,
        scheduler: Arc<BattleScheduler<PgStore>>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                db,
                store,
                engine,
                scheduler,
            },
        }
    }

    /// Start the HTTP server.
    pub async fn start(self) -> anyhow::Result<()> {
        let app = Router::new()
            .merge(routes::api_routes())
            .with_state(self.state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.port));
        info!(port = self.config.port, "api server starting");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
