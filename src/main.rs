//! Clan Battle Coordinator — Entry Point
//!
//! Loads configuration, initializes all subsystems, and runs the scheduler
//! loop and API server. Handles graceful shutdown on SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};

use clan_battle_coordinator::battles::BattleEngine;
use clan_battle_coordinator::config::Config;
use clan_battle_coordinator::db::pool;
use clan_battle_coordinator::db::postgres::PgStore;
use clan_battle_coordinator::gametime;
use clan_battle_coordinator::logging;
use clan_battle_coordinator::schedule::{run_scheduler_loop, BattleScheduler};
use clan_battle_coordinator::web::server::WebServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if missing)
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    logging::structured::init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        tick_interval_secs = config.scheduler.tick_interval_secs,
        "clan-battle-coordinator starting"
    );

    // Initialize database
    let db_pool = pool::create_pool(&config.database).await?;
    pool::run_migrations(&db_pool).await?;
    info!("database connected and migrations applied");

    let store = Arc::new(PgStore::new(db_pool.clone()));
    let engine = Arc::new(BattleEngine::new(store.clone()));
    let scheduler = Arc::new(BattleScheduler::new(store.clone()));

    // A fresh database starts with the scheduler disabled, anchored to the
    // next Game-Time midnight, until an operator confirms the cadence.
    scheduler
        .ensure_initialized(gametime::advance_days(chrono::Utc::now(), 1))
        .await?;

    // Spawn scheduler loop
    let scheduler_loop = scheduler.clone();
    let tick_interval = Duration::from_secs(config.scheduler.tick_interval_secs);
    let _scheduler_handle = tokio::spawn(async move {
        run_scheduler_loop(scheduler_loop, tick_interval).await;
    });

    // Spawn API server (if enabled)
    let _web_handle = if config.web.enabled {
        let web_server = WebServer::new(
            config.web.clone(),
            db_pool.clone(),
            store.clone(),
            engine.clone(),
            scheduler.clone(),
        );
        Some(tokio::spawn(async move {
            if let Err(e) = web_server.start().await {
                error!(error = %e, "web server error");
            }
        }))
    } else {
        None
    };

    info!("all subsystems started, waiting for shutdown signal");

    // Wait for shutdown signal
    let shutdown = async {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => { info!("received SIGINT"); }
            _ = sigterm.recv() => { info!("received SIGTERM"); }
        }
    };

    shutdown.await;

    info!("shutdown complete");
    Ok(())
}
