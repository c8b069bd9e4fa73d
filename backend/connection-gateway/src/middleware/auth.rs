use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_auth::{extract_bearer, require_role, ExternalClaims, RoleGateError};

use crate::error::GatewayError;
use crate::AppState;

/// Verify the external bearer token and expose its claims to handlers.
///
/// Every failure kind gets the same generic 401; the kind only goes to the log.
pub async fn require_auth(
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
        tracing::warn!(path = %request.uri().path(), "request without bearer token");
        return GatewayError::Unauthorized.into_response();
    };

    let claims = match state.verifier.verify(token) {
        Ok(claims) => claims,
        Err(kind) => {
            tracing::warn!(path = %request.uri().path(), reason = %kind, "access token rejected");
            return GatewayError::Unauthorized.into_response();
        }
    };

    tracing::debug!(sub = %claims.sub, id_persona = claims.person_id, "authenticated");
    request.extensions_mut().insert(claims);
    next.run(request).await
}

/// Role gate; layer it inside `require_auth`:
/// `from_fn_with_state(ROLE_ADMIN, require_role_layer)`.
pub async fn require_role_layer(
    State(role): State<&'static str>,
    request: Request,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<ExternalClaims>() else {
        return GatewayError::Unauthorized.into_response();
    };

    if let Err(RoleGateError::Forbidden { required }) = require_role(claims, role) {
        tracing::warn!(
            sub = %claims.sub,
            roles = ?claims.roles,
            required = role,
            path = %request.uri().path(),
            "role gate refused request"
        );
        return GatewayError::Forbidden(required).into_response();
    }

    next.run(request).await
}
