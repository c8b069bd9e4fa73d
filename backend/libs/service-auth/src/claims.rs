//! Claim shapes for the two signing domains.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A claim shape that can travel inside a signed token.
///
/// `AUDIENCE` is written into every issued token and checked on verification; it is what
/// keeps the external and internal domains apart at the type level.
pub trait TokenClaims: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const AUDIENCE: &'static str;

    /// Subject used in logs.
    fn subject(&self) -> &str;

    /// Issued at (Unix timestamp, seconds)
    fn issued_at(&self) -> i64;

    /// Expiration (Unix timestamp, seconds)
    fn expires_at(&self) -> i64;
}

/// End-user identity carried by the external access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Person the user acts as
    #[serde(rename = "id_persona")]
    pub person_id: i64,
    /// Role names, embedded verbatim at issuance
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

impl ExternalClaims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl TokenClaims for ExternalClaims {
    const AUDIENCE: &'static str = "external";

    fn subject(&self) -> &str {
        &self.sub
    }

    fn issued_at(&self) -> i64 {
        self.iat
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Service identity carried by the gateway's internal token. No roles: any holder of a
/// valid internal token is trusted completely by the internal service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalClaims {
    /// Service subject (e.g. `connection-gateway`)
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

impl TokenClaims for InternalClaims {
    const AUDIENCE: &'static str = "internal";

    fn subject(&self) -> &str {
        &self.sub
    }

    fn issued_at(&self) -> i64 {
        self.iat
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}
