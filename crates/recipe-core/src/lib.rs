pub mod config;
pub mod error;
pub mod models;
pub mod security;
pub mod store;
pub mod validation;

pub use config::{ConfigManager, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig, Settings};
pub use error::*;
pub use models::*;
pub use security::PasswordHasher;
pub use store::Database;
pub use validation::ValidationErrors;
