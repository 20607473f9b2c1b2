use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `development` adds internal error detail to failure responses
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
        }
    }
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://storefront.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing session tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Initial admin password; generated on first start if unset
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            admin_username: default_admin_username(),
            admin_password: None,
        }
    }
}

fn default_jwt_secret() -> String {
    // Random per process unless configured, so tokens do not survive a restart
    use rand::Rng;
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

fn default_admin_username() -> String {
    "admin".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// Apply `STOREFRONT_*` / `DATABASE_URL` overrides from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("STOREFRONT_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(port) = lookup("STOREFRONT_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid STOREFRONT_PORT: {}", port))?;
        }
        if let Some(env) = lookup("STOREFRONT_ENV") {
            self.server.environment = env.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.environment, Environment::Production);
        assert_eq!(config.auth.token_ttl_hours, 168);
        assert_eq!(config.auth.admin_username, "admin");
        assert_eq!(config.auth.jwt_secret.len(), 64);
        assert!(config.cors.allowed_origins.is_empty());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8081
            environment = "development"

            [auth]
            jwt_secret = "s3cret"
            admin_password = "changeme"

            [cors]
            allowed_origins = ["http://localhost:5173"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.server.is_development());
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.admin_password.as_deref(), Some("changeme"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.cors.allowed_origins.len(), 1);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(|key| match key {
                "STOREFRONT_PORT" => Some("9000".to_string()),
                "STOREFRONT_ENV" => Some("dev".to_string()),
                "DATABASE_URL" => Some("sqlite::memory:".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(config.server.is_development());
        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == "STOREFRONT_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }
}
