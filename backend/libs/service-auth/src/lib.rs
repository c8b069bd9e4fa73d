//! Two-tier token trust for the connection broker
//!
//! Two independent signing domains share one verifier shape:
//! - **External tokens** carry an end-user identity (user id, person id, roles) and are
//!   presented by browsers/apps to the gateway.
//! - **Internal tokens** carry only a service subject and prove that a call to the
//!   internal connection service originates from the trusted gateway.
//!
//! Each domain is a distinct claim type (`ExternalClaims`, `InternalClaims`) with its own
//! audience, so a `Verifier<InternalClaims>` can never hand back an external identity and
//! vice versa.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use service_auth::{require_role, ExternalClaims, TokenIssuer, Verifier};
//!
//! let secret = b"Vq7#Lm2pXz9RtK4wYb8NcE5uHs3JdA6G";
//! let issuer = TokenIssuer::<ExternalClaims>::new(secret, Duration::from_secs(3600));
//! let verifier = Verifier::<ExternalClaims>::new(secret);
//!
//! let signed = issuer
//!     .issue_access_token("17", 42, vec!["cliente".to_string()])
//!     .unwrap();
//! let claims = verifier.verify(&signed.token).unwrap();
//! assert!(require_role(&claims, "cliente").is_ok());
//! ```

pub mod claims;
pub mod expiry;
pub mod issuer;
pub mod roles;
pub mod secret_validation;
pub mod verifier;

pub use claims::{ExternalClaims, InternalClaims, TokenClaims};
pub use expiry::{resolve_access_expiry, resolve_internal_expiry};
pub use issuer::{IssueError, SignedToken, TokenIssuer};
pub use roles::{require_role, RoleGateError, ROLE_ADMIN, ROLE_CLIENTE};
pub use secret_validation::{
    ensure_distinct_secrets, require_usable_secret, validate_secret_strength, SecretError,
    SecretStrength,
};
pub use verifier::{VerifyError, Verifier};

/// Extract the token from an `Authorization` header value.
///
/// Expects `Bearer <token>`; the scheme is matched case-insensitively and an empty token is
/// treated as absent.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
