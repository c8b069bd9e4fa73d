//! Access Token Issuer and Internal Token Issuer.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tracing::info;

use crate::claims::{ExternalClaims, InternalClaims, TokenClaims};

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("token lifetime out of range: {0:?}")]
    Lifetime(Duration),
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone, Serialize)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs tokens of one claim shape with one secret and one lifetime.
pub struct TokenIssuer<C> {
    encoding_key: EncodingKey,
    lifetime: Duration,
    _claims: PhantomData<fn() -> C>,
}

impl<C: TokenClaims> TokenIssuer<C> {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            lifetime,
            _claims: PhantomData,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn window(&self, now: DateTime<Utc>) -> Result<(i64, DateTime<Utc>), IssueError> {
        let lifetime = chrono::Duration::from_std(self.lifetime)
            .map_err(|_| IssueError::Lifetime(self.lifetime))?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or(IssueError::Lifetime(self.lifetime))?;
        Ok((now.timestamp(), expires_at))
    }

    fn sign(&self, claims: &C, expires_at: DateTime<Utc>) -> Result<SignedToken, IssueError> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?;

        info!(
            audience = C::AUDIENCE,
            subject = %claims.subject(),
            expires_at = %expires_at.to_rfc3339(),
            "Issued token"
        );

        Ok(SignedToken { token, expires_at })
    }
}

impl TokenIssuer<ExternalClaims> {
    /// Issue an external access token. Roles are embedded as given.
    pub fn issue_access_token(
        &self,
        user_id: &str,
        person_id: i64,
        roles: Vec<String>,
    ) -> Result<SignedToken, IssueError> {
        self.issue_access_token_at(user_id, person_id, roles, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        user_id: &str,
        person_id: i64,
        roles: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<SignedToken, IssueError> {
        let (iat, expires_at) = self.window(now)?;
        let claims = ExternalClaims {
            sub: user_id.to_string(),
            person_id,
            roles,
            iat,
            exp: expires_at.timestamp(),
            aud: ExternalClaims::AUDIENCE.to_string(),
        };
        self.sign(&claims, expires_at)
    }
}

impl TokenIssuer<InternalClaims> {
    /// Issue an internal token identifying the calling service.
    pub fn issue_internal_token(&self, service_subject: &str) -> Result<SignedToken, IssueError> {
        self.issue_internal_token_at(service_subject, Utc::now())
    }

    pub fn issue_internal_token_at(
        &self,
        service_subject: &str,
        now: DateTime<Utc>,
    ) -> Result<SignedToken, IssueError> {
        let (iat, expires_at) = self.window(now)?;
        let claims = InternalClaims {
            sub: service_subject.to_string(),
            iat,
            exp: expires_at.timestamp(),
            aud: InternalClaims::AUDIENCE.to_string(),
        };
        self.sign(&claims, expires_at)
    }
}

impl<C: TokenClaims> fmt::Debug for TokenIssuer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("audience", &C::AUDIENCE)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
