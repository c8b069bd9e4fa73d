//! Role Gate

use crate::claims::ExternalClaims;

/// End customer acting on their own connection requests.
pub const ROLE_CLIENTE: &str = "cliente";
/// Staff operating the review queue.
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleGateError {
    #[error("role '{required}' required")]
    Forbidden { required: String },
}

/// Exact, case-sensitive containment check of `role` in the claim's role set.
pub fn require_role(claims: &ExternalClaims, role: &str) -> Result<(), RoleGateError> {
    if claims.has_role(role) {
        Ok(())
    } else {
        Err(RoleGateError::Forbidden {
            required: role.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::TokenClaims;

    fn claims_with(roles: &[&str]) -> ExternalClaims {
        ExternalClaims {
            sub: "1".to_string(),
            person_id: 1,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: 0,
            exp: 0,
            aud: ExternalClaims::AUDIENCE.to_string(),
        }
    }

    #[test]
    fn test_allowed() {
        assert!(require_role(&claims_with(&["cliente", "admin"]), ROLE_ADMIN).is_ok());
    }

    #[test]
    fn test_forbidden() {
        let err = require_role(&claims_with(&["cliente"]), ROLE_ADMIN).unwrap_err();
        assert_eq!(
            err,
            RoleGateError::Forbidden {
                required: "admin".to_string()
            }
        );
    }

    #[test]
    fn test_empty_role_set_is_always_forbidden() {
        let claims = claims_with(&[]);
        assert!(require_role(&claims, ROLE_ADMIN).is_err());
        assert!(require_role(&claims, ROLE_CLIENTE).is_err());
    }

    #[test]
    fn test_case_sensitive() {
        assert!(require_role(&claims_with(&["ADMIN"]), ROLE_ADMIN).is_err());
        assert!(require_role(&claims_with(&["admin "]), ROLE_ADMIN).is_err());
    }
}
