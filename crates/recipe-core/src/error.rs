use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationErrors> for RecipeError {
    fn from(errors: ValidationErrors) -> Self {
        RecipeError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, RecipeError>;
