use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_auth::{extract_bearer, InternalClaims, TokenClaims};

use crate::error::AppError;
use crate::AppState;

/// Gate for every `/internal/*` route: only callers holding a valid internal token get past.
///
/// Runs before body extraction, so an unauthenticated request never touches the store.
pub async fn require_internal_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer);

    let Some(token) = token else {
        tracing::warn!(path = %request.uri().path(), "internal request without bearer token");
        return AppError::Unauthorized.into_response();
    };

    let claims: InternalClaims = match state.verifier.verify(token) {
        Ok(claims) => claims,
        Err(kind) => {
            tracing::warn!(
                path = %request.uri().path(),
                reason = %kind,
                "internal token rejected"
            );
            return AppError::Unauthorized.into_response();
        }
    };

    tracing::debug!(caller = claims.subject(), "internal token accepted");
    request.extensions_mut().insert(claims);
    next.run(request).await
}
