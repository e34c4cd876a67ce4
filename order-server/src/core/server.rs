//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config)?,
        };

        // Restore timers and auto-confirm for orders left in flight
        if let Err(e) = state.service.resume().await {
            tracing::warn!(error = %e, "Failed to resume in-flight orders");
        }

        let tasks = state.start_background_tasks();

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(
            address = %addr,
            environment = %self.config.environment,
            "Order server starting"
        );

        let app = crate::api::build_router(state.clone());
        let shutdown = state.shutdown.clone();
        let signal = async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            shutdown.cancel();
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;

        tasks.shutdown().await;

        let drift = state.service.store().pending_reconciliation();
        if !drift.is_empty() {
            tracing::warn!(
                orders = drift.len(),
                "Orders held only by the fallback store are lost on exit"
            );
        }
        Ok(())
    }
}
