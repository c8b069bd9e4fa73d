use serde::Deserialize;
use service_auth::require_usable_secret;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub internal_jwt: InternalJwtConfig,
    pub review_queue: ReviewQueueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Only the verifying half: the connection service never issues internal tokens.
#[derive(Clone, Deserialize)]
pub struct InternalJwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReviewQueueConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ReviewQueueConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl std::fmt::Debug for InternalJwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalJwtConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_connections() -> u32 {
    10
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("database.url", "postgres://localhost/connections")?
            .set_default("database.max_connections", 10)?
            .set_default("review_queue.default_page_size", 20)?
            .set_default("review_queue.max_page_size", 100)?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        require_usable_secret("INTERNAL_JWT__SECRET", &self.internal_jwt.secret)?;

        let queue = &self.review_queue;
        if queue.max_page_size == 0 {
            anyhow::bail!("REVIEW_QUEUE__MAX_PAGE_SIZE must be positive");
        }
        if queue.default_page_size == 0 || queue.default_page_size > queue.max_page_size {
            anyhow::bail!(
                "REVIEW_QUEUE__DEFAULT_PAGE_SIZE must be between 1 and {}",
                queue.max_page_size
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, queue: ReviewQueueConfig) -> Config {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/connections".to_string(),
                max_connections: default_max_connections(),
            },
            internal_jwt: InternalJwtConfig {
                secret: secret.to_string(),
            },
            review_queue: queue,
        }
    }

    #[test]
    fn test_weak_secret_rejected() {
        let err = config("secret", ReviewQueueConfig::default())
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("INTERNAL_JWT__SECRET"));
    }

    #[test]
    fn test_default_page_size_bounded_by_max() {
        let queue = ReviewQueueConfig {
            default_page_size: 200,
            max_page_size: 100,
        };
        assert!(config("pW3!nG8kTz1QxR6vLc9MhY2sBd5FjE0a", queue)
            .validate()
            .is_err());
    }

    #[test]
    fn test_valid_config() {
        assert!(config("pW3!nG8kTz1QxR6vLc9MhY2sBd5FjE0a", ReviewQueueConfig::default())
            .validate()
            .is_ok());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let cfg = config("pW3!nG8kTz1QxR6vLc9MhY2sBd5FjE0a", ReviewQueueConfig::default());
        assert!(!format!("{:?}", cfg).contains("pW3!"));
    }
}
