//! HTTP error response mapping.

use std::error::Error;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use routines_domain::error::{NotFoundError, RoutinesError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`RoutinesError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(RoutinesError);

impl From<RoutinesError> for ApiError {
    fn from(err: RoutinesError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RoutinesError::Validation(_) | RoutinesError::Hydration(_) | RoutinesError::Import(_) => {
                StatusCode::BAD_REQUEST
            }
            RoutinesError::NotFound(_) => StatusCode::NOT_FOUND,
            RoutinesError::Capability(_) | RoutinesError::Storage(_) => {
                tracing::error!(error = %chain(&self.0), "request failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal server error".to_string(),
                    }),
                )
                    .into_response();
            }
        };

        (
            status,
            Json(ErrorBody {
                error: chain(&self.0),
            }),
        )
            .into_response()
    }
}

/// `outer: inner: innermost`
fn chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use routines_domain::error::HydrationError;

    use super::*;

    #[test]
    fn should_map_validation_to_bad_request() {
        let response = ApiError::from(ValidationError::EmptyName).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_not_found_to_404() {
        let response = ApiError::from(NotFoundError {
            entity: "Routine",
            id: "r1".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_map_storage_to_internal_error() {
        let err = RoutinesError::Storage("disk full".into());
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn should_include_error_sources_in_message() {
        let err = RoutinesError::from(HydrationError::from(ValidationError::EmptyName));
        assert_eq!(
            chain(&err),
            "invalid routine configuration: invalid routine: name must not be empty"
        );
    }
}
