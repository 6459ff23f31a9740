use analytics::AnalyticsError;
use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::DbError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Failures while assembling a KPI report.
#[derive(Error, Debug)]
pub enum KpiError {
    #[error(transparent)]
    Store(#[from] DbError),
    #[error(transparent)]
    Computation(#[from] AnalyticsError),
    #[error("cycle {cycle} references missing pond {pond}")]
    OrphanCycle { cycle: Uuid, pond: Uuid },
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Anything unexpected. `message` is what the client sees; `source` is only logged.
    #[error("{message}: {source}")]
    Internal {
        message: &'static str,
        source: KpiError,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Wraps a `KpiError` with the client-facing message of an endpoint.
    pub fn internal(message: &'static str) -> impl FnOnce(KpiError) -> AppError {
        move |source| AppError::Internal { message, source }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal { message, source } => {
                match &source {
                    KpiError::Store(db_err) => {
                        tracing::error!(error = ?db_err, "{message}: store error.")
                    }
                    KpiError::Computation(err) => {
                        tracing::error!(error = ?err, "{message}: computation error.")
                    }
                    KpiError::OrphanCycle { .. } => {
                        tracing::error!(error = %source, "{message}: inconsistent data.")
                    }
                }
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };

        let body = Json(json!({ "success": false, "error": error_message }));
        (status, body).into_response()
    }
}
