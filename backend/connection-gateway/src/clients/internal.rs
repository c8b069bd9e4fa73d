use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use connection_types::{
    AuthenticatedUser, ConfirmFeasibility, ConnectionListQuery, ConnectionRequest,
    CreateConnectionRequest, LoginRequest, RejectFeasibility, PERSON_HEADER,
};
use error_types::{ApiResponse, Page};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use service_auth::{InternalClaims, IssueError, TokenIssuer};

use crate::error::GatewayError;

/// Why an internal call failed, before it is mapped to what the external caller sees.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamFailure {
    #[error("upstream responded {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("upstream unreachable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("upstream response unreadable: {0}")]
    Malformed(String),

    #[error("internal token issuance failed: {0}")]
    Token(#[from] IssueError),
}

impl From<UpstreamFailure> for GatewayError {
    /// 400/404/409 keep the upstream message; an upstream 401/403 means the gateway's own
    /// internal credentials are wrong, which the external caller must never see.
    fn from(failure: UpstreamFailure) -> Self {
        match failure {
            UpstreamFailure::Status { status, message } => match status {
                StatusCode::BAD_REQUEST => GatewayError::Validation(message),
                StatusCode::NOT_FOUND => GatewayError::NotFound(message),
                StatusCode::CONFLICT => GatewayError::Conflict(message),
                other => GatewayError::Internal(format!("upstream responded {other}: {message}")),
            },
            UpstreamFailure::Unavailable(_) => GatewayError::UpstreamUnavailable,
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

/// HTTP client for the internal connection service.
///
/// Each call carries a freshly issued internal token and is bounded by the configured
/// timeout. Calls are never retried.
#[derive(Clone)]
pub struct ConnectionServiceClient {
    http: Client,
    base_url: String,
    issuer: Arc<TokenIssuer<InternalClaims>>,
    subject: String,
}

impl ConnectionServiceClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        issuer: TokenIssuer<InternalClaims>,
        subject: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            issuer: Arc::new(issuer),
            subject: subject.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/internal{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, UpstreamFailure> {
        let token = self.issuer.issue_internal_token(&self.subject)?;

        let response = request
            .bearer_auth(token.token)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(classify)?;

        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            UpstreamFailure::Malformed(format!("status {status}, body not an envelope: {e}"))
        })?;

        if !status.is_success() || !envelope.success {
            let message = envelope.error_message().to_string();
            tracing::debug!(%status, error = %message, "connection service reported failure");
            return Err(UpstreamFailure::Status { status, message });
        }

        envelope
            .data
            .ok_or_else(|| UpstreamFailure::Malformed("success envelope without data".to_string()))
    }

    fn scoped(request: RequestBuilder, person_id: Option<i64>) -> RequestBuilder {
        match person_id {
            Some(person_id) => request.header(PERSON_HEADER, person_id.to_string()),
            None => request,
        }
    }

    pub async fn login(&self, body: &LoginRequest) -> Result<AuthenticatedUser, UpstreamFailure> {
        self.execute(self.http.post(self.url("/auth/login")).json(body))
            .await
    }

    pub async fn create(
        &self,
        body: &CreateConnectionRequest,
    ) -> Result<ConnectionRequest, UpstreamFailure> {
        self.execute(self.http.post(self.url("/conexiones")).json(body))
            .await
    }

    pub async fn list(
        &self,
        query: &ConnectionListQuery,
        person_id: Option<i64>,
    ) -> Result<Page<ConnectionRequest>, UpstreamFailure> {
        let request = self.http.get(self.url("/conexiones")).query(query);
        self.execute(Self::scoped(request, person_id)).await
    }

    pub async fn pending(
        &self,
        query: &ConnectionListQuery,
    ) -> Result<Page<ConnectionRequest>, UpstreamFailure> {
        self.execute(self.http.get(self.url("/conexiones/pendientes")).query(query))
            .await
    }

    pub async fn get(
        &self,
        id: i64,
        person_id: Option<i64>,
    ) -> Result<ConnectionRequest, UpstreamFailure> {
        let request = self.http.get(self.url(&format!("/conexiones/{id}")));
        self.execute(Self::scoped(request, person_id)).await
    }

    pub async fn confirm(
        &self,
        id: i64,
        body: &ConfirmFeasibility,
    ) -> Result<ConnectionRequest, UpstreamFailure> {
        let url = self.url(&format!("/conexiones/{id}/confirmar-factibilidad"));
        self.execute(self.http.post(url).json(body)).await
    }

    pub async fn reject(
        &self,
        id: i64,
        body: &RejectFeasibility,
    ) -> Result<ConnectionRequest, UpstreamFailure> {
        let url = self.url(&format!("/conexiones/{id}/rechazar-factibilidad"));
        self.execute(self.http.post(url).json(body)).await
    }
}

fn classify(err: reqwest::Error) -> UpstreamFailure {
    if err.is_timeout() || err.is_connect() {
        tracing::warn!(error = %err, "connection service call failed");
        UpstreamFailure::Unavailable(err)
    } else {
        UpstreamFailure::Malformed(err.to_string())
    }
}
