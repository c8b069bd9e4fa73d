use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use connection_types::{AuthenticatedUser, LoginRequest};
use error_types::ApiResponse;

use crate::error::Result;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthenticatedUser>>> {
    let Json(request) = body?;
    let user = state.auth.authenticate(request).await?;
    Ok(Json(ApiResponse::ok(user)))
}
