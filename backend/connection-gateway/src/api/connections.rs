//! Customer self-service routes. The person is always taken from the token, never the body.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use connection_types::{
    describe_validation_errors, ConnectionListQuery, ConnectionRequest, CreateConnectionRequest,
    SelfServiceConnectionBody,
};
use error_types::{ApiResponse, Page};
use service_auth::ExternalClaims;
use validator::Validate;

use crate::error::{GatewayError, Result};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_own).post(create_own))
        .route("/:id", get(get_own))
}

async fn create_own(
    State(state): State<AppState>,
    Extension(claims): Extension<ExternalClaims>,
    body: std::result::Result<Json<SelfServiceConnectionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ConnectionRequest>>)> {
    let Json(body) = body?;
    body.validate()
        .map_err(|e| GatewayError::Validation(describe_validation_errors(&e)))?;

    let request = CreateConnectionRequest::self_service(claims.person_id, body);
    let created = state.connections.create(&request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

async fn list_own(
    State(state): State<AppState>,
    Extension(claims): Extension<ExternalClaims>,
    query: std::result::Result<Query<ConnectionListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<ConnectionRequest>>>> {
    let Query(query) = query?;
    let page = state
        .connections
        .list(&query, Some(claims.person_id))
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn get_own(
    State(state): State<AppState>,
    Extension(claims): Extension<ExternalClaims>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<ConnectionRequest>>> {
    let Path(id) = id?;
    let connection = state
        .connections
        .get(id, Some(claims.person_id))
        .await?;
    Ok(Json(ApiResponse::ok(connection)))
}
