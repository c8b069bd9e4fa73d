use std::time::Duration;

use serde::Deserialize;
use service_auth::{
    ensure_distinct_secrets, require_usable_secret, resolve_access_expiry, resolve_internal_expiry,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub internal_jwt: InternalJwtConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// External access tokens.
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default)]
    pub expiry_minutes: Option<i64>,
    #[serde(default)]
    pub expiry_hours: Option<i64>,
}

/// Internal service tokens presented to the connection service.
#[derive(Clone, Deserialize)]
pub struct InternalJwtConfig {
    pub secret: String,
    #[serde(default)]
    pub expiry_minutes: Option<i64>,
    #[serde(default)]
    pub expiry_days: Option<i64>,
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl JwtConfig {
    pub fn lifetime(&self) -> Duration {
        resolve_access_expiry(self.expiry_minutes, self.expiry_hours)
    }
}

impl InternalJwtConfig {
    pub fn lifetime(&self) -> Duration {
        resolve_internal_expiry(self.expiry_minutes, self.expiry_days)
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiry_minutes", &self.expiry_minutes)
            .field("expiry_hours", &self.expiry_hours)
            .finish()
    }
}

impl std::fmt::Debug for InternalJwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalJwtConfig")
            .field("secret", &"<redacted>")
            .field("expiry_minutes", &self.expiry_minutes)
            .field("expiry_days", &self.expiry_days)
            .field("subject", &self.subject)
            .finish()
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("internal_jwt.subject", "connection-gateway")?
            .set_default("upstream.base_url", "http://127.0.0.1:8081")?
            .set_default("upstream.timeout_ms", 5000)?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;

        tracing::info!(
            access_ttl_secs = config.jwt.lifetime().as_secs(),
            internal_ttl_secs = config.internal_jwt.lifetime().as_secs(),
            upstream = %config.upstream.base_url,
            "gateway configuration resolved"
        );
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        require_usable_secret("JWT__SECRET", &self.jwt.secret)?;
        require_usable_secret("INTERNAL_JWT__SECRET", &self.internal_jwt.secret)?;
        ensure_distinct_secrets(&self.jwt.secret, &self.internal_jwt.secret)?;

        if self.internal_jwt.subject.trim().is_empty() {
            anyhow::bail!("INTERNAL_JWT__SUBJECT must not be empty");
        }
        let base = &self.upstream.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!("UPSTREAM__BASE_URL must be an http(s) URL, got '{}'", base);
        }
        if self.upstream.timeout_ms == 0 {
            anyhow::bail!("UPSTREAM__TIMEOUT_MS must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const EXTERNAL: &str = "Vq7#Lm2pXz9RtK4wYb8NcE5uHs3JdA6G";
    const INTERNAL: &str = "pW3!nG8kTz1QxR6vLc9MhY2sBd5FjE0a";

    fn config(external: &str, internal: &str) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            jwt: JwtConfig {
                secret: external.to_string(),
                expiry_minutes: None,
                expiry_hours: Some(2),
            },
            internal_jwt: InternalJwtConfig {
                secret: internal.to_string(),
                expiry_minutes: Some(15),
                expiry_days: Some(7),
                subject: "connection-gateway".to_string(),
            },
            upstream: UpstreamConfig {
                base_url: "http://127.0.0.1:8081".to_string(),
                timeout_ms: 5000,
            },
        }
    }

    #[test]
    fn test_lifetimes_follow_priority() {
        let cfg = config(EXTERNAL, INTERNAL);
        assert_eq!(cfg.jwt.lifetime(), Duration::from_secs(2 * 3600));
        assert_eq!(cfg.internal_jwt.lifetime(), Duration::from_secs(15 * 60));
        assert_eq!(cfg.upstream.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_shared_secret_rejected() {
        assert!(config(EXTERNAL, EXTERNAL).validate().is_err());
        assert!(config(EXTERNAL, INTERNAL).validate().is_ok());
    }

    #[test]
    fn test_weak_secret_rejected() {
        let err = config("changeme", INTERNAL).validate().unwrap_err();
        assert!(err.to_string().contains("JWT__SECRET"));
    }

    #[test]
    fn test_upstream_url_checked() {
        let mut cfg = config(EXTERNAL, INTERNAL);
        cfg.upstream.base_url = "connection-service:8081".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", config(EXTERNAL, INTERNAL));
        assert!(!rendered.contains(EXTERNAL));
        assert!(!rendered.contains(INTERNAL));
    }

    #[test]
    #[serial]
    fn test_load_from_environment() {
        let vars = [
            ("JWT__SECRET", EXTERNAL),
            ("JWT__EXPIRY_HOURS", "2"),
            ("INTERNAL_JWT__SECRET", INTERNAL),
            ("UPSTREAM__BASE_URL", "http://connection-service:8081"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let loaded = Config::load();
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let cfg = loaded.unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.internal_jwt.subject, "connection-gateway");
        assert_eq!(cfg.upstream.timeout_ms, 5000);
        assert_eq!(cfg.jwt.lifetime(), Duration::from_secs(2 * 3600));
        assert_eq!(cfg.internal_jwt.lifetime(), Duration::from_secs(30 * 86_400));
    }

    #[test]
    #[serial]
    fn test_load_rejects_shared_secret() {
        std::env::set_var("JWT__SECRET", EXTERNAL);
        std::env::set_var("INTERNAL_JWT__SECRET", EXTERNAL);

        let loaded = Config::load();
        std::env::remove_var("JWT__SECRET");
        std::env::remove_var("INTERNAL_JWT__SECRET");

        assert!(loaded.is_err());
    }
}
