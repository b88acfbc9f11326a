//! # routinesd: routines daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Build the routine engine over the state store and the virtual desktop,
//!   load the stored routines and spawn the evaluation driver
//! - Build the axum router and serve it
//! - On Ctrl-C, stop serving, then stop every trigger without reverting
//!   actions
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use routines_adapter_http_axum::router;
use routines_adapter_http_axum::state::AppState;
use routines_adapter_storage_sqlite_sqlx::SqliteStateStore;
use routines_adapter_virtual::VirtualDesktop;
use routines_app::engine::{RoutineEngine, drive};
use routines_app::event_bus::InProcessEventBus;
use routines_app::ports::{SystemClock, TokioScheduler};
use routines_app::trigger::TriggerContext;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Storage
    let db = config.storage().build().await?;
    let store = Arc::new(SqliteStateStore::new(db.pool().clone()));

    // Engine
    let event_bus = Arc::new(InProcessEventBus::new(config.engine.event_capacity));
    let context = TriggerContext {
        clock: Arc::new(SystemClock),
        scheduler: Arc::new(TokioScheduler::new(tokio::runtime::Handle::current())),
        settings: config.trigger_settings(),
    };
    let (mut engine, signals) = RoutineEngine::new(
        store,
        Arc::new(VirtualDesktop::default()),
        Arc::clone(&event_bus),
        context,
        config.engine_settings(),
    );
    engine.load().await?;
    let engine = Arc::new(Mutex::new(engine));
    let driver = tokio::spawn(drive(Arc::clone(&engine), signals));

    // HTTP
    let app = router::build(AppState::from_arcs(Arc::clone(&engine), event_bus));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "routinesd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The engine holds a signal sender of its own, so the driver never
    // runs dry by itself.
    engine.lock().await.shutdown();
    driver.abort();
    db.close().await;
    tracing::info!("routinesd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
