use crate::{create_router, AppState};
use anyhow::{Context, Result};
use recipe_core::ConfigManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::info;

pub struct Server {
    state: AppState,
    addr: String,
}

impl Server {
    pub async fn new(config: Arc<ConfigManager>) -> Result<Self> {
        let addr = config.settings().bind_address();
        let state = AppState::new(config)
            .await
            .context("initializing application state")?;
        Ok(Self { state, addr })
    }

    pub fn from_state(state: AppState) -> Self {
        let addr = state.settings().bind_address();
        Self { state, addr }
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("binding to {}", self.addr))?;
        self.serve(listener).await
    }

    /// Serves on an already-bound listener until Ctrl+C or SIGTERM.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local: SocketAddr = listener.local_addr()?;
        let db = self.state.db.clone();
        let router = create_router(self.state);

        info!("Recipe API listening on http://{}", local);
        info!("  POST /api/user/create/       - Register a user");
        info!("  POST /api/user/token/        - Obtain an auth token");
        info!("  GET|PATCH|PUT /api/user/me/  - Current user profile");
        info!("  GET|POST /api/recipe/tags/   - Tags of the current user");
        info!("  GET|POST /api/recipe/ingredients/ - Ingredients of the current user");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serving HTTP")?;

        db.close().await;
        info!("Server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
