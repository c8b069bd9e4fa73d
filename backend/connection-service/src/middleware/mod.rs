mod internal_auth;

pub use internal_auth::require_internal_token;
