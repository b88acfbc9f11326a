//! JSON REST handlers for routines.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use routines_app::ports::{Capabilities, EventPublisher, StateStore};
use routines_domain::error::NotFoundError;
use routines_domain::evaluation::{ReloadSummary, RoutineStatus};
use routines_domain::id::RoutineId;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<RoutineStatus>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<RoutineStatus>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<RoutineStatus>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

fn not_found(id: &RoutineId) -> NotFoundError {
    NotFoundError {
        entity: "Routine",
        id: id.to_string(),
    }
}

/// `GET /api/routines`: list every routine with its runtime state.
pub async fn list<S, C, P>(State(state): State<AppState<S, C, P>>) -> Result<ListResponse, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let routines = state.engine.lock().await.list();
    Ok(ListResponse::Ok(Json(routines)))
}

/// `GET /api/routines/:id`: get a routine by id.
pub async fn get<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let id = RoutineId::from_str(&id)?;
    let status = state
        .engine
        .lock()
        .await
        .status(&id)
        .ok_or_else(|| not_found(&id))?;
    Ok(GetResponse::Ok(Json(status)))
}

/// `POST /api/routines`: add a routine, replacing any with the same id.
///
/// The body is a raw routine configuration. A missing `id` is generated.
pub async fn create<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Json(raw): Json<Value>,
) -> Result<CreateResponse, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let mut engine = state.engine.lock().await;
    let id = engine.add_routine(raw).await?;
    let status = engine.status(&id).ok_or_else(|| not_found(&id))?;
    Ok(CreateResponse::Created(Json(status)))
}

/// `DELETE /api/routines/:id`: remove a routine and its captured state.
pub async fn delete<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let id = RoutineId::from_str(&id)?;
    state.engine.lock().await.remove_routine(&id).await?;
    Ok(DeleteResponse::NoContent)
}

/// `POST /api/routines/reload`: re-read the stored routines.
pub async fn reload<S, C, P>(
    State(state): State<AppState<S, C, P>>,
) -> Result<Json<ReloadSummary>, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let summary = state.engine.lock().await.reload().await?;
    Ok(Json(summary))
}
