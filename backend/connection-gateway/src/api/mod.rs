mod admin;
mod auth;
mod connections;

use axum::{middleware::from_fn_with_state, Router};
use service_auth::{ROLE_ADMIN, ROLE_CLIENTE};

use crate::middleware::{require_auth, require_role_layer};
use crate::AppState;

/// `/api/v1`. Route layers run outermost-last, so authentication always precedes the role gate.
pub fn routes(state: AppState) -> Router<AppState> {
    let customer = connections::routes()
        .route_layer(from_fn_with_state(ROLE_CLIENTE, require_role_layer))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let staff = admin::routes()
        .route_layer(from_fn_with_state(ROLE_ADMIN, require_role_layer))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/auth", auth::routes(state))
        .nest("/conexiones", customer)
        .nest("/admin/conexiones", staff)
}
