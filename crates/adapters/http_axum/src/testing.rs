//! Test harness: an engine over an in-memory store and the virtual desktop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use routines_adapter_virtual::VirtualDesktop;
use routines_app::engine::{EngineSettings, RoutineEngine};
use routines_app::event_bus::InProcessEventBus;
use routines_app::ports::{ManualScheduler, StateStore, SystemClock};
use routines_app::trigger::{TriggerContext, TriggerSettings};
use routines_domain::error::RoutinesError;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::router;
use crate::state::AppState;

#[derive(Default)]
pub(crate) struct MemoryStore(Mutex<HashMap<String, Value>>);

impl StateStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, RoutinesError> {
        let documents = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), RoutinesError> {
        let mut documents = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        documents.insert(key.to_string(), value);
        Ok(())
    }
}

pub(crate) struct Harness {
    pub state: AppState<MemoryStore, VirtualDesktop, Arc<InProcessEventBus>>,
    pub store: Arc<MemoryStore>,
    pub desktop: VirtualDesktop,
    pub event_bus: Arc<InProcessEventBus>,
}

impl Harness {
    pub fn router(&self) -> Router {
        router::build(self.state.clone())
    }
}

pub(crate) fn setup() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let desktop = VirtualDesktop::default();
    let event_bus = Arc::new(InProcessEventBus::new(64));
    let context = TriggerContext {
        clock: Arc::new(SystemClock),
        scheduler: Arc::new(ManualScheduler::new()),
        settings: TriggerSettings::default(),
    };
    let (engine, _signals) = RoutineEngine::new(
        Arc::clone(&store),
        Arc::new(desktop.clone()),
        Arc::clone(&event_bus),
        context,
        EngineSettings::default(),
    );
    Harness {
        state: AppState::new(engine, Arc::clone(&event_bus)),
        store,
        desktop,
        event_bus,
    }
}

/// Turns dark mode on while headphones are plugged in.
pub(crate) fn dark_mode_routine(id: &str) -> Value {
    json!({
        "id": id,
        "name": id,
        "triggers": [{"type": "headphones", "config": {"state": true}}],
        "actions": [{"type": "dark_mode", "config": {"enabled": true}}],
    })
}

/// Send one request and decode the JSON response body (`null` when empty).
pub(crate) async fn request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
