//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use routines_app::ports::{Capabilities, EventPublisher, StateStore};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Serves the JSON API under `/api` and a liveness probe at `/health`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<S, C, P>(state: AppState<S, C, P>) -> Router
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::testing::{request, setup};

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let app = setup().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_return_404_for_unknown_path() {
        let (status, _) = request(setup().router(), "GET", "/api/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
