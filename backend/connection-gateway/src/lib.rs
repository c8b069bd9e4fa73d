//! External connection gateway
//!
//! Authenticates end users and staff with external access tokens, applies the role gate per
//! route, and forwards each call to the internal connection service with a fresh internal
//! token. The gateway holds no connection data of its own.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod middleware;

use std::sync::Arc;

use axum::{routing::get, Router};
use service_auth::{ExternalClaims, InternalClaims, TokenIssuer, Verifier};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::clients::ConnectionServiceClient;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub connections: ConnectionServiceClient,
    pub issuer: Arc<TokenIssuer<ExternalClaims>>,
    pub verifier: Verifier<ExternalClaims>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let internal_issuer = TokenIssuer::<InternalClaims>::new(
            config.internal_jwt.secret.as_bytes(),
            config.internal_jwt.lifetime(),
        );
        let connections = ConnectionServiceClient::new(
            &config.upstream.base_url,
            config.upstream.timeout(),
            internal_issuer,
            config.internal_jwt.subject.clone(),
        )?;

        Ok(Self {
            connections,
            issuer: Arc::new(TokenIssuer::new(
                config.jwt.secret.as_bytes(),
                config.jwt.lifetime(),
            )),
            verifier: Verifier::new(config.jwt.secret.as_bytes()),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
