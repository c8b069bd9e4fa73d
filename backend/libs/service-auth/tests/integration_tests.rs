//! Integration Tests for two-tier token trust
//!
//! Issuer -> token -> Verifier -> Role Gate, across both signing domains.

use std::time::Duration;

use chrono::Utc;
use service_auth::{
    require_role, resolve_access_expiry, ExternalClaims, InternalClaims, RoleGateError,
    TokenIssuer, Verifier, VerifyError, ROLE_ADMIN, ROLE_CLIENTE,
};

const EXTERNAL_SECRET: &[u8] = b"Vq7#Lm2pXz9RtK4wYb8NcE5uHs3JdA6G";
const INTERNAL_SECRET: &[u8] = b"pW3!nG8kTz1QxR6vLc9MhY2sBd5FjE0a";

fn external_pair(lifetime: Duration) -> (TokenIssuer<ExternalClaims>, Verifier<ExternalClaims>) {
    (
        TokenIssuer::new(EXTERNAL_SECRET, lifetime),
        Verifier::new(EXTERNAL_SECRET),
    )
}

#[test]
fn test_round_trip_preserves_identity() {
    let (issuer, verifier) = external_pair(resolve_access_expiry(None, None));

    let cases: Vec<(&str, i64, Vec<String>)> = vec![
        ("1", 1, vec![]),
        ("17", 42, vec![ROLE_CLIENTE.to_string()]),
        (
            "9001",
            7,
            vec![ROLE_ADMIN.to_string(), ROLE_CLIENTE.to_string()],
        ),
        ("user-äöü", i64::MAX, vec!["técnico".to_string()]),
    ];

    for (user_id, person_id, roles) in cases {
        let signed = issuer
            .issue_access_token(user_id, person_id, roles.clone())
            .expect("issue");
        let claims = verifier.verify(&signed.token).expect("verify");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.person_id, person_id);
        assert_eq!(claims.roles, roles);
    }
}

#[test]
fn test_expired_regardless_of_signature() {
    let past = Utc::now() - chrono::Duration::hours(3);

    let own = TokenIssuer::<ExternalClaims>::new(EXTERNAL_SECRET, Duration::from_secs(3600));
    let foreign = TokenIssuer::<ExternalClaims>::new(INTERNAL_SECRET, Duration::from_secs(3600));
    let verifier = Verifier::<ExternalClaims>::new(EXTERNAL_SECRET);

    for issuer in [&own, &foreign] {
        let signed = issuer
            .issue_access_token_at("17", 42, vec![ROLE_CLIENTE.to_string()], past)
            .unwrap();
        assert_eq!(verifier.verify(&signed.token), Err(VerifyError::Expired));
    }
}

#[test]
fn test_domains_do_not_cross() {
    let external_issuer =
        TokenIssuer::<ExternalClaims>::new(EXTERNAL_SECRET, Duration::from_secs(600));
    let internal_issuer =
        TokenIssuer::<InternalClaims>::new(INTERNAL_SECRET, Duration::from_secs(600));
    let external_verifier = Verifier::<ExternalClaims>::new(EXTERNAL_SECRET);
    let internal_verifier = Verifier::<InternalClaims>::new(INTERNAL_SECRET);

    let user_token = external_issuer
        .issue_access_token("17", 42, vec![ROLE_ADMIN.to_string()])
        .unwrap();
    let service_token = internal_issuer
        .issue_internal_token("connection-gateway")
        .unwrap();

    assert!(internal_verifier.verify(&user_token.token).is_err());
    assert!(external_verifier.verify(&service_token.token).is_err());

    assert!(external_verifier.verify(&user_token.token).is_ok());
    assert!(internal_verifier.verify(&service_token.token).is_ok());
}

#[test]
fn test_domains_do_not_cross_even_with_shared_secret() {
    let internal_issuer =
        TokenIssuer::<InternalClaims>::new(EXTERNAL_SECRET, Duration::from_secs(600));
    let external_issuer =
        TokenIssuer::<ExternalClaims>::new(EXTERNAL_SECRET, Duration::from_secs(600));

    let service_token = internal_issuer.issue_internal_token("gw").unwrap();
    let user_token = external_issuer
        .issue_access_token("1", 1, vec![ROLE_ADMIN.to_string()])
        .unwrap();

    assert_eq!(
        Verifier::<ExternalClaims>::new(EXTERNAL_SECRET).verify(&service_token.token),
        Err(VerifyError::InvalidFormat)
    );
    assert_eq!(
        Verifier::<InternalClaims>::new(EXTERNAL_SECRET).verify(&user_token.token),
        Err(VerifyError::WrongAudience)
    );
}

#[test]
fn test_verified_claims_feed_role_gate() {
    let (issuer, verifier) = external_pair(Duration::from_secs(600));
    let signed = issuer
        .issue_access_token("17", 42, vec![ROLE_CLIENTE.to_string()])
        .unwrap();
    let claims = verifier.verify(&signed.token).unwrap();

    assert!(require_role(&claims, ROLE_CLIENTE).is_ok());
    assert!(matches!(
        require_role(&claims, ROLE_ADMIN),
        Err(RoleGateError::Forbidden { .. })
    ));
}
