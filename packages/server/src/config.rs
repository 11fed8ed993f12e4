use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser. Empty disables CORS.
    pub allow_origins: Vec<String>,
    /// Preflight cache lifetime in seconds.
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    /// Pool settings suited to a single short-lived connection user.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in days.
    pub token_ttl_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Defaults, then `config/config.toml` if present, then `HRIS__*`
    /// environment variables (e.g. `HRIS__AUTH__JWT_SECRET`).
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("auth.token_ttl_days", 7)?
            .add_source(File::with_name("config/config").required(false))
            .add_source(Environment::with_prefix("HRIS").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.token_ttl_days <= 0 {
            return Err(ConfigError::Message(
                "auth.token_ttl_days must be positive".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "database.min_connections exceeds database.max_connections".into(),
            ));
        }
        Ok(())
    }
}
