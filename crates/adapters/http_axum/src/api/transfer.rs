//! Export and import of routine definitions.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::Value;

use routines_app::ports::{Capabilities, EventPublisher, StateStore};
use routines_domain::error::{ImportFormatError, RoutinesError};
use routines_domain::id::RoutineId;
use routines_domain::transfer::TransferDocument;

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned by a successful import.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// Number of routines added.
    pub imported: usize,
    /// Fresh ids assigned to them, in document order.
    pub ids: Vec<RoutineId>,
}

/// `GET /api/export`: every routine, without ids or runtime state.
pub async fn export<S, C, P>(
    State(state): State<AppState<S, C, P>>,
) -> Result<Json<TransferDocument>, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let document = state.engine.lock().await.export();
    Ok(Json(document))
}

/// `POST /api/import`: append the routines of an export document.
///
/// The body is read as text so that a document which is not even JSON is
/// rejected like any other malformed export.
pub async fn import<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    body: String,
) -> Result<Json<ImportResponse>, ApiError>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let document: Value = serde_json::from_str(&body)
        .map_err(|err| RoutinesError::from(ImportFormatError::from(err)))?;
    let ids = state.engine.lock().await.import(document).await?;
    Ok(Json(ImportResponse {
        imported: ids.len(),
        ids,
    }))
}
