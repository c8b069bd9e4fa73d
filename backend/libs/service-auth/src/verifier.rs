//! Credential Verifier
//!
//! `Verifier<C>` validates an HS256 token for exactly one claim shape. Verification is a
//! pure function of (token, secret, verification time) and reports one of four failure
//! kinds. Callers at the HTTP boundary collapse all of them into a generic 401 and keep
//! the kind for logs.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::claims::TokenClaims;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Not a decodable token: bad segments, base64, JSON, or a claim shape mismatch
    #[error("token is malformed")]
    InvalidFormat,

    /// Signed with another secret, tampered with, or signed with a disallowed algorithm
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    /// Validly signed but minted for the other trust domain
    #[error("token audience does not match")]
    WrongAudience,
}

pub struct Verifier<C> {
    decoding_key: DecodingKey,
    _claims: PhantomData<fn() -> C>,
}

impl<C: TokenClaims> Verifier<C> {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            _claims: PhantomData,
        }
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<C, VerifyError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`.
    ///
    /// Expiry is checked before the signature, so an expired token reports `Expired`
    /// whether or not its signature would have matched.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<C, VerifyError> {
        decode_header(token).map_err(|_| VerifyError::InvalidFormat)?;

        let unverified = decode_unverified::<C>(token)?;
        if unverified.expires_at() < now.timestamp() {
            return Err(VerifyError::Expired);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // exp is compared against `now` above, never against the wall clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.set_audience(&[C::AUDIENCE]);

        decode::<C>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| classify(e.kind()))
    }
}

/// Decode the payload without trusting it, only to read `exp` and confirm the shape.
fn decode_unverified<C: TokenClaims>(token: &str) -> Result<C, VerifyError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<C>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| VerifyError::InvalidFormat)
}

fn classify(kind: &ErrorKind) -> VerifyError {
    match kind {
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => VerifyError::InvalidSignature,
        ErrorKind::InvalidAudience => VerifyError::WrongAudience,
        _ => VerifyError::InvalidFormat,
    }
}

impl<C> Clone for Verifier<C> {
    fn clone(&self) -> Self {
        Self {
            decoding_key: self.decoding_key.clone(),
            _claims: PhantomData,
        }
    }
}

impl<C: TokenClaims> fmt::Debug for Verifier<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("audience", &C::AUDIENCE)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ExternalClaims, InternalClaims};
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"Vq7#Lm2pXz9RtK4wYb8NcE5uHs3JdA6G";
    const OTHER_SECRET: &[u8] = b"pW3!nG8kTz1QxR6vLc9MhY2sBd5FjE0a";

    fn external(exp_offset: Duration) -> ExternalClaims {
        let now = Utc::now();
        ExternalClaims {
            sub: "17".to_string(),
            person_id: 42,
            roles: vec!["cliente".to_string()],
            iat: now.timestamp(),
            exp: (now + exp_offset).timestamp(),
            aud: ExternalClaims::AUDIENCE.to_string(),
        }
    }

    fn sign<T: serde::Serialize>(claims: &T, secret: &[u8]) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn test_valid_token() {
        let verifier = Verifier::<ExternalClaims>::new(SECRET);
        let claims = external(Duration::minutes(10));
        let token = sign(&claims, SECRET);

        assert_eq!(verifier.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_malformed_token() {
        let verifier = Verifier::<ExternalClaims>::new(SECRET);

        assert_eq!(verifier.verify("not-a-token"), Err(VerifyError::InvalidFormat));
        assert_eq!(verifier.verify("a.b.c"), Err(VerifyError::InvalidFormat));
        assert_eq!(verifier.verify(""), Err(VerifyError::InvalidFormat));
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = Verifier::<ExternalClaims>::new(SECRET);
        let token = sign(&external(Duration::minutes(10)), OTHER_SECRET);

        assert_eq!(verifier.verify(&token), Err(VerifyError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload() {
        let verifier = Verifier::<ExternalClaims>::new(SECRET);
        let token = sign(&external(Duration::minutes(10)), SECRET);

        let mut elevated = external(Duration::minutes(10));
        elevated.roles = vec!["admin".to_string()];
        let forged = sign(&elevated, OTHER_SECRET);

        // Original header and signature, forged payload
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(verifier.verify(&tampered), Err(VerifyError::InvalidSignature));
    }

    #[test]
    fn test_expired_wins_over_bad_signature() {
        let verifier = Verifier::<ExternalClaims>::new(SECRET);
        let expired = external(Duration::minutes(-5));

        assert_eq!(
            verifier.verify(&sign(&expired, SECRET)),
            Err(VerifyError::Expired)
        );
        assert_eq!(
            verifier.verify(&sign(&expired, OTHER_SECRET)),
            Err(VerifyError::Expired)
        );
    }

    #[test]
    fn test_verify_at_is_relative_to_supplied_time() {
        let verifier = Verifier::<ExternalClaims>::new(SECRET);
        let claims = external(Duration::minutes(10));
        let token = sign(&claims, SECRET);

        let later = Utc::now() + Duration::minutes(11);
        assert_eq!(verifier.verify_at(&token, later), Err(VerifyError::Expired));

        let earlier = Utc::now() + Duration::minutes(9);
        assert!(verifier.verify_at(&token, earlier).is_ok());
    }

    #[test]
    fn test_internal_token_rejected_by_external_verifier() {
        let now = Utc::now();
        let internal = InternalClaims {
            sub: "connection-gateway".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(10)).timestamp(),
            aud: InternalClaims::AUDIENCE.to_string(),
        };
        let token = sign(&internal, SECRET);

        // Missing roles / id_persona: the shape itself does not decode
        let verifier = Verifier::<ExternalClaims>::new(SECRET);
        assert_eq!(verifier.verify(&token), Err(VerifyError::InvalidFormat));
    }

    #[test]
    fn test_external_token_rejected_by_internal_verifier() {
        let token = sign(&external(Duration::minutes(10)), SECRET);

        // The external shape is a superset of the internal one, so only the audience
        // keeps it out.
        let verifier = Verifier::<InternalClaims>::new(SECRET);
        assert_eq!(verifier.verify(&token), Err(VerifyError::WrongAudience));
    }

    #[test]
    fn test_disallowed_algorithm() {
        let verifier = Verifier::<ExternalClaims>::new(SECRET);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &external(Duration::minutes(10)),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(verifier.verify(&token), Err(VerifyError::InvalidSignature));
    }
}
