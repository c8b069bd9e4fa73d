//! Internal connection service
//!
//! Record of truth for connection requests. Only reachable by the gateway: every route under
//! `/internal` requires an internal service token, and no end-user identity is ever trusted
//! here beyond the person scope the gateway forwards.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

use std::sync::Arc;

use axum::{routing::get, Router};
use service_auth::{InternalClaims, Verifier};
use tower_http::trace::TraceLayer;

use crate::config::ReviewQueueConfig;
use crate::repository::{ConnectionStore, UserStore};
use crate::services::{AuthService, ConnectionWorkflow, ReviewQueue};

#[derive(Clone)]
pub struct AppState {
    pub workflow: ConnectionWorkflow,
    pub review_queue: ReviewQueue,
    pub auth: AuthService,
    pub verifier: Verifier<InternalClaims>,
}

impl AppState {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        users: Arc<dyn UserStore>,
        internal_secret: &[u8],
        review_queue: ReviewQueueConfig,
    ) -> Self {
        Self {
            workflow: ConnectionWorkflow::new(connections.clone()),
            review_queue: ReviewQueue::new(connections, review_queue),
            auth: AuthService::new(users),
            verifier: Verifier::new(internal_secret),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/internal", api::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
