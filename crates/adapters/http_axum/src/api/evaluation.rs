//! Manual evaluation trigger.

use axum::Json;
use axum::extract::State;

use routines_app::ports::{Capabilities, EventPublisher, StateStore};
use routines_domain::evaluation::EvaluationOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/evaluate`: run one evaluation pass now.
pub async fn evaluate<S, C, P>(
    State(state): State<AppState<S, C, P>>,
) -> Result<Json<EvaluationOutcome>, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let outcome = state.engine.lock().await.evaluate().await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{dark_mode_routine, request, setup};

    #[tokio::test]
    async fn should_report_routines_activated_by_the_pass() {
        let harness = setup();
        request(harness.router(), "POST", "/api/routines", Some(dark_mode_routine("focus"))).await;
        harness.desktop.simulate_headphones(true);

        let (status, body) = request(harness.router(), "POST", "/api/evaluate", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"outcome": "completed", "activated": ["focus"], "deactivated": []})
        );
    }
}
