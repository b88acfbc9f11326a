//! Shared application state for axum handlers.

use std::sync::Arc;

use routines_app::engine::RoutineEngine;
use routines_app::event_bus::InProcessEventBus;
use tokio::sync::Mutex;

/// Application state shared across all axum handlers.
///
/// Generic over the state store, capability adapter and event publisher of
/// the engine to avoid dynamic dispatch. `Clone` is implemented manually so
/// the underlying types themselves do not need to be `Clone`.
pub struct AppState<S, C, P> {
    /// The engine, shared with the evaluation driver.
    pub engine: Arc<Mutex<RoutineEngine<S, C, P>>>,
    /// Bus the engine publishes to, streamed over SSE.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<S, C, P> Clone for AppState<S, C, P> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<S, C, P> AppState<S, C, P> {
    /// Create a new application state owning the engine.
    pub fn new(engine: RoutineEngine<S, C, P>, event_bus: Arc<InProcessEventBus>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            event_bus,
        }
    }

    /// Create a new application state from an engine already shared with
    /// background tasks.
    pub fn from_arcs(
        engine: Arc<Mutex<RoutineEngine<S, C, P>>>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self { engine, event_bus }
    }
}
