use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use config as cfg;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_PREFIX: &str = "RECIPE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. "sqlite://data/recipe.db" or "sqlite::memory:"
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn default_url() -> String {
        "sqlite://data/recipe.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "SecurityConfig::default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl SecurityConfig {
    fn default_min_password_length() -> usize {
        5
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            min_password_length: Self::default_min_password_length(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    /// Settings suitable for tests: in-memory database, defaults elsewhere.
    pub fn for_testing() -> Self {
        Self {
            env: "test".to_string(),
            database: DatabaseConfig::in_memory(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.server.host.trim().is_empty(),
            "server.host cannot be empty"
        );
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            !self.database.url.trim().is_empty(),
            "database.url cannot be empty"
        );
        anyhow::ensure!(
            self.database.max_connections > 0,
            "database.max_connections must be > 0"
        );
        anyhow::ensure!(
            self.security.min_password_length > 0,
            "security.min_password_length must be > 0"
        );
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings: Arc<Settings>,
    config_dir: PathBuf,
    env: String,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::load(None, None)
    }

    pub fn load(config_dir: Option<PathBuf>, env_override: Option<String>) -> Result<Self> {
        let env_name = env_override.unwrap_or_else(Settings::default_env);
        let config_dir = config_dir.unwrap_or_else(Self::default_config_dir);
        let settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.validate()?;
        debug!(env = %env_name, dir = ?config_dir, "Configuration loaded");

        Ok(Self {
            settings: Arc::new(settings),
            config_dir,
            env: env_name,
        })
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self {
            env: settings.env.clone(),
            settings: Arc::new(settings),
            config_dir: PathBuf::from("."),
        }
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    /// `./config/` when it exists, otherwise the current directory.
    pub fn default_config_dir() -> PathBuf {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            return project_config;
        }
        cwd
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        Self::load_layers(
            config_dir,
            env_name,
            cfg::Environment::with_prefix(ENV_PREFIX).separator("__"),
        )
    }

    fn load_layers(
        config_dir: &Path,
        env_name: &str,
        environment: cfg::Environment,
    ) -> Result<Settings> {
        let settings: Settings = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(environment)
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }
}
