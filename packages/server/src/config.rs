use common::config::BackendConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// File the server reads and watches, without extension.
pub const CONFIG_FILE: &str = "config/config";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Drop the `Secure` flag from cookies, for plain HTTP development.
    pub insecure_cookies: bool,
    /// Public root the frontend is served under.
    pub http_root: String,
    pub max_upload_bytes: usize,
    pub cors: CorsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8888)?
        .set_default("server.cors.allow_origins", Vec::<String>::new())?
        .set_default("server.cors.max_age", 3600)?
        .set_default("server.insecure_cookies", false)?
        .set_default("server.http_root", "/")?
        .set_default("server.max_upload_bytes", 64 * 1024 * 1024)?
        .set_default("database.url", "postgres://localhost/pixur")?
        .set_default("database.max_connections", 20)?
        .set_default("log_level", "info")
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = with_defaults()?
            // Load from config/config.toml
            .add_source(File::with_name(CONFIG_FILE).required(false))
            // Override from environment (e.g., PIXUR__DATABASE__URL)
            .add_source(Environment::with_prefix("PIXUR").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// The built-in defaults, ignoring files and environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        with_defaults()?.build()?.try_deserialize()
    }
}
