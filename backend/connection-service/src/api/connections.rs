use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use connection_types::{
    ConfirmFeasibility, ConnectionListQuery, ConnectionRequest, CreateConnectionRequest,
    RejectFeasibility, PERSON_HEADER,
};
use error_types::{ApiResponse, Page};

use crate::error::{AppError, Result};
use crate::AppState;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type IdPath = std::result::Result<Path<i64>, PathRejection>;
type ListQuery = std::result::Result<Query<ConnectionListQuery>, QueryRejection>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_connection).get(list_connections))
        .route("/pendientes", get(review_queue))
        .route("/:id", get(get_connection))
        .route("/:id/confirmar-factibilidad", post(confirm_feasibility))
        .route("/:id/rechazar-factibilidad", post(reject_feasibility))
}

/// Person scope set by the gateway for customer calls; absent for staff calls.
fn person_scope(headers: &HeaderMap) -> Result<Option<i64>> {
    let Some(value) = headers.get(PERSON_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .map(Some)
        .ok_or_else(|| AppError::Validation(format!("{PERSON_HEADER} must be a positive integer")))
}

async fn create_connection(
    State(state): State<AppState>,
    body: JsonBody<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConnectionRequest>>)> {
    let Json(request) = body?;
    let created = state.workflow.solicit(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

async fn list_connections(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: ListQuery,
) -> Result<Json<ApiResponse<Page<ConnectionRequest>>>> {
    let Query(query) = query?;
    let person = person_scope(&headers)?;
    let page = state.review_queue.list(&query, person).await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn review_queue(
    State(state): State<AppState>,
    query: ListQuery,
) -> Result<Json<ApiResponse<Page<ConnectionRequest>>>> {
    let Query(query) = query?;
    let page = state.review_queue.pending(&query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn get_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: IdPath,
) -> Result<Json<ApiResponse<ConnectionRequest>>> {
    let Path(id) = id?;
    let person = person_scope(&headers)?;
    let connection = state.workflow.get(id, person).await?;
    Ok(Json(ApiResponse::ok(connection)))
}

async fn confirm_feasibility(
    State(state): State<AppState>,
    id: IdPath,
    body: JsonBody<ConfirmFeasibility>,
) -> Result<Json<ApiResponse<ConnectionRequest>>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let confirmed = state.workflow.confirm(id, body).await?;
    Ok(Json(ApiResponse::ok(confirmed)))
}

async fn reject_feasibility(
    State(state): State<AppState>,
    id: IdPath,
    body: JsonBody<RejectFeasibility>,
) -> Result<Json<ApiResponse<ConnectionRequest>>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let rejected = state.workflow.reject(id, body).await?;
    Ok(Json(ApiResponse::ok(rejected)))
}
