//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod evaluation;
#[allow(clippy::missing_errors_doc)]
pub mod routines;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod transfer;

use axum::Router;
use axum::routing::{get, post};

use routines_app::ports::{Capabilities, EventPublisher, StateStore};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, C, P>() -> Router<AppState<S, C, P>>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        // Routines
        .route(
            "/routines",
            get(routines::list::<S, C, P>).post(routines::create::<S, C, P>),
        )
        .route("/routines/reload", post(routines::reload::<S, C, P>))
        .route(
            "/routines/{id}",
            get(routines::get::<S, C, P>).delete(routines::delete::<S, C, P>),
        )
        // Evaluation
        .route("/evaluate", post(evaluation::evaluate::<S, C, P>))
        // Export / import
        .route("/export", get(transfer::export::<S, C, P>))
        .route("/import", post(transfer::import::<S, C, P>))
        // Events
        .route("/events/stream", get(sse::stream::<S, C, P>))
}
