use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use connection_types::{
    describe_validation_errors, LoginRequest, LoginResponse, INVALID_CREDENTIALS,
};
use error_types::ApiResponse;
use serde::Serialize;
use service_auth::ExternalClaims;
use validator::Validate;

use crate::clients::UpstreamFailure;
use crate::error::{GatewayError, Result};
use crate::middleware::require_auth;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state, require_auth))
        .route("/login", post(login))
}

async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let Json(request) = body?;
    request
        .validate()
        .map_err(|e| GatewayError::Validation(describe_validation_errors(&e)))?;

    let user = state
        .connections
        .login(&request)
        .await
        .map_err(|failure| match failure {
            UpstreamFailure::Status { status, message }
                if status == StatusCode::UNAUTHORIZED && message == INVALID_CREDENTIALS =>
            {
                GatewayError::Unauthorized
            }
            other => other.into(),
        })?;

    let signed = state
        .issuer
        .issue_access_token(&user.user_id.to_string(), user.person_id, user.roles)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token: signed.token,
        token_type: "Bearer".to_string(),
        expires_at: signed.expires_at,
    })))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id_usuario: String,
    pub id_persona: i64,
    pub roles: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

async fn me(Extension(claims): Extension<ExternalClaims>) -> Json<ApiResponse<MeResponse>> {
    Json(ApiResponse::ok(MeResponse {
        expires_at: DateTime::from_timestamp(claims.exp, 0),
        id_usuario: claims.sub,
        id_persona: claims.person_id,
        roles: claims.roles,
    }))
}
