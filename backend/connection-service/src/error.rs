use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use connection_types::INVALID_CREDENTIALS;
use error_types::ApiResponse;

use crate::repository::StoreError;
use crate::services::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Exists, but not in a state that allows the requested decision
    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Store(#[source] StoreError),
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => AppError::Validation(msg),
            WorkflowError::NotFound(msg) => AppError::NotFound(msg),
            err @ WorkflowError::InvalidTransition { .. } => {
                AppError::InvalidTransition(err.to_string())
            }
            WorkflowError::Conflict(msg) => AppError::Conflict(msg),
            WorkflowError::InvalidCredentials => AppError::InvalidCredentials,
            WorkflowError::Store(StoreError::Constraint(msg)) => AppError::Conflict(format!(
                "request conflicts with existing data: {msg}"
            )),
            WorkflowError::Store(err) => AppError::Store(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized | AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) | AppError::InvalidTransition(msg) => {
                (StatusCode::NOT_FOUND, msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Store(e) => {
                tracing::error!(error = ?e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
