use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use connection_types::{describe_validation_errors, AuthenticatedUser, LoginRequest};
use validator::Validate;

use super::{Result, WorkflowError};
use crate::repository::UserStore;

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> std::result::Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks credentials on behalf of the gateway; token issuance happens there.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn authenticate(&self, request: LoginRequest) -> Result<AuthenticatedUser> {
        request
            .validate()
            .map_err(|e| WorkflowError::Validation(describe_validation_errors(&e)))?;

        let user = self
            .users
            .find_active_by_email(&request.email)
            .await?
            .ok_or(WorkflowError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash) {
            tracing::warn!(id_usuario = user.user_id, "login rejected: password mismatch");
            return Err(WorkflowError::InvalidCredentials);
        }

        tracing::info!(id_usuario = user.user_id, roles = ?user.roles, "credentials verified");
        Ok(AuthenticatedUser {
            user_id: user.user_id,
            person_id: user.person_id,
            roles: user.roles,
        })
    }
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "stored password hash is not a valid PHC string");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRecord;
    use crate::repository::MemoryStore;

    fn service(active: bool) -> AuthService {
        let store = MemoryStore::new();
        store.add_user(UserRecord {
            user_id: 11,
            person_id: 5,
            email: "ana.perez@example.com".to_string(),
            password_hash: hash_password("conexion-segura").unwrap(),
            roles: vec!["cliente".to_string()],
            active,
        });
        AuthService::new(Arc::new(store))
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let user = service(true)
            .authenticate(login("Ana.Perez@example.com", "conexion-segura"))
            .await
            .unwrap();

        assert_eq!(user.user_id, 11);
        assert_eq!(user.person_id, 5);
        assert_eq!(user.roles, vec!["cliente".to_string()]);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let err = service(true)
            .authenticate(login("ana.perez@example.com", "otra-clave"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_log_in() {
        let err = service(false)
            .authenticate(login("ana.perez@example.com", "conexion-segura"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidCredentials));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
