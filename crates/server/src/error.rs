use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cronica_catalog::CatalogError;
use cronica_core::error::{ApiError, ErrorEnvelope};
use cronica_tracker::TrackerError;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
#[derive(Debug)]
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        let envelope = ErrorEnvelope::from(&self.0);
        (status, Json(envelope)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound => Self(ApiError::NotFound("catalog entry not found".into())),
            other => Self(ApiError::Upstream(other.to_string())),
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::Catalog(inner) => inner.into(),
            TrackerError::NotTracked(key) => Self(ApiError::NotFound(format!("item {key} is not tracked"))),
            TrackerError::Persistence(key) => {
                Self(ApiError::Internal(format!("could not save item {key}")))
            }
        }
    }
}
