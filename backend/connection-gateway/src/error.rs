use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use error_types::ApiResponse;

/// Every failure the gateway can report to an external caller.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing, malformed, expired or foreign token, or wrong credentials
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: requires role {0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The connection service did not answer within the deadline or refused the connection
    #[error("upstream service unavailable")]
    UpstreamUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        GatewayError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for GatewayError {
    fn from(rejection: PathRejection) -> Self {
        GatewayError::Validation(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            GatewayError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            GatewayError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            GatewayError::UpstreamUnavailable => {
                tracing::error!("connection service unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            GatewayError::Internal(detail) => {
                tracing::error!(detail = %detail, "gateway internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses() {
        let cases = [
            (GatewayError::Unauthorized, StatusCode::UNAUTHORIZED),
            (GatewayError::Forbidden("admin".into()), StatusCode::FORBIDDEN),
            (GatewayError::Validation("limit".into()), StatusCode::BAD_REQUEST),
            (GatewayError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (GatewayError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                GatewayError::UpstreamUnavailable,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GatewayError::Internal("sql".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_detail_not_exposed() {
        let response =
            GatewayError::Internal("upstream returned 401: unauthorized".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": "internal server error"})
        );
    }
}
