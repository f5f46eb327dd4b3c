use recipe_api::{init_tracing, Server};
use recipe_core::ConfigManager;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(ConfigManager::new()?);
    init_tracing(&config.settings().logging.level);
    info!(env = config.env(), dir = ?config.config_dir(), "Configuration loaded");

    let server = Server::new(config).await?;
    server.run().await
}
