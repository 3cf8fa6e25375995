//! Server lifecycle: serve HTTP until a shutdown signal, then drain and
//! release resources

use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use voto_api::{create_router, AppState};
use voto_core::Config;
use voto_realtime::ChannelHub;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct VotoServer {
    config: Config,
    state: AppState,
    hub: ChannelHub,
    pool: PgPool,
}

impl VotoServer {
    #[must_use]
    pub const fn new(config: Config, state: AppState, hub: ChannelHub, pool: PgPool) -> Self {
        Self {
            config,
            state,
            hub,
            pool,
        }
    }

    /// Start the HTTP server and wait for it to stop or for a shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let http_address = self.config.http_address();
        let listener = tokio::net::TcpListener::bind(&http_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_address}: {e}"))?;
        info!("HTTP server listening on {}", http_address);

        let router = create_router(self.state.clone(), &self.config.server);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let mut http_handle = tokio::spawn(async move {
            let graceful = async move {
                let _ = shutdown_rx.changed().await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }
            info!("HTTP server shut down gracefully");
        });

        tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        let _ = shutdown_tx.send(true);
        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        info!("Shutting down Voto server...");

        // 1. Wait for sockets to close (with timeout)
        let active = self.hub.connection_count();
        if active > 0 {
            info!(
                "Waiting up to {}s for {} WebSocket connection(s) to close...",
                DRAIN_TIMEOUT.as_secs(),
                active
            );
            let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
            loop {
                let remaining = self.hub.connection_count();
                if remaining == 0 {
                    info!("All connections drained");
                    break;
                }
                if tokio::time::Instant::now() >= deadline {
                    warn!(
                        "Drain timeout reached with {} connection(s) still open, proceeding with shutdown",
                        remaining
                    );
                    break;
                }
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        }

        // 2. Close the database connection pool
        info!("Closing database connection pool...");
        self.pool.close().await;
        info!("Database pool closed");

        info!("Voto server shut down complete");
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C signal");
            }
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
