use std::sync::Arc;

use recipe_core::{ConfigManager, Database, Settings};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ConfigManager>,
}

impl AppState {
    pub async fn new(config: Arc<ConfigManager>) -> recipe_core::Result<Self> {
        let db = Database::open(&config.settings().database).await?;
        Ok(Self { db, config })
    }

    pub fn settings(&self) -> &Settings {
        self.config.settings()
    }

    pub fn min_password_length(&self) -> usize {
        self.settings().security.min_password_length
    }
}
