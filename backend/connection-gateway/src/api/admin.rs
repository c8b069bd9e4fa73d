//! Staff routes: assisted creation, listings, the review queue and feasibility decisions.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use connection_types::{
    describe_validation_errors, AssistedConnectionBody, ConfirmFeasibility, ConnectionListQuery,
    ConnectionRequest, CreateConnectionRequest, RejectFeasibility,
};
use error_types::{ApiResponse, Page};
use validator::Validate;

use crate::error::{GatewayError, Result};
use crate::AppState;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type IdPath = std::result::Result<Path<i64>, PathRejection>;
type ListQuery = std::result::Result<Query<ConnectionListQuery>, QueryRejection>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all).post(create_assisted))
        .route("/pendientes", get(review_queue))
        .route("/:id", get(get_any))
        .route("/:id/confirmar-factibilidad", post(confirm_feasibility))
        .route("/:id/rechazar-factibilidad", post(reject_feasibility))
}

fn check<T: Validate>(body: &T) -> Result<()> {
    body.validate()
        .map_err(|e| GatewayError::Validation(describe_validation_errors(&e)))
}

async fn create_assisted(
    State(state): State<AppState>,
    body: JsonBody<AssistedConnectionBody>,
) -> Result<(StatusCode, Json<ApiResponse<ConnectionRequest>>)> {
    let Json(body) = body?;
    check(&body)?;

    let created = state
        .connections
        .create(&CreateConnectionRequest::assisted(body))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

async fn list_all(
    State(state): State<AppState>,
    query: ListQuery,
) -> Result<Json<ApiResponse<Page<ConnectionRequest>>>> {
    let Query(query) = query?;
    let page = state.connections.list(&query, None).await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn review_queue(
    State(state): State<AppState>,
    query: ListQuery,
) -> Result<Json<ApiResponse<Page<ConnectionRequest>>>> {
    let Query(query) = query?;
    let page = state.connections.pending(&query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn get_any(
    State(state): State<AppState>,
    id: IdPath,
) -> Result<Json<ApiResponse<ConnectionRequest>>> {
    let Path(id) = id?;
    let connection = state.connections.get(id, None).await?;
    Ok(Json(ApiResponse::ok(connection)))
}

async fn confirm_feasibility(
    State(state): State<AppState>,
    id: IdPath,
    body: JsonBody<ConfirmFeasibility>,
) -> Result<Json<ApiResponse<ConnectionRequest>>> {
    let Path(id) = id?;
    let Json(body) = body?;
    check(&body)?;

    let confirmed = state.connections.confirm(id, &body).await?;
    Ok(Json(ApiResponse::ok(confirmed)))
}

async fn reject_feasibility(
    State(state): State<AppState>,
    id: IdPath,
    body: JsonBody<RejectFeasibility>,
) -> Result<Json<ApiResponse<ConnectionRequest>>> {
    let Path(id) = id?;
    let Json(body) = body?;
    check(&body)?;

    let rejected = state.connections.reject(id, &body).await?;
    Ok(Json(ApiResponse::ok(rejected)))
}
