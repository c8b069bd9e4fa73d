use sqlx::FromRow;

/// A login-capable user with the roles it carries into the external token.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    #[sqlx(rename = "id_usuario")]
    pub user_id: i64,
    #[sqlx(rename = "id_persona")]
    pub person_id: i64,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    #[sqlx(rename = "activo")]
    pub active: bool,
}
