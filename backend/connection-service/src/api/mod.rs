mod auth;
mod connections;

use axum::{middleware, Router};

use crate::middleware::require_internal_token;
use crate::AppState;

/// Everything under `/internal`, behind the internal-token gate.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/conexiones", connections::routes())
        .nest("/auth", auth::routes())
        .route_layer(middleware::from_fn_with_state(state, require_internal_token))
}
