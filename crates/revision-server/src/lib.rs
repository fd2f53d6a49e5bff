mod cors;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use revision_config::Config;
use tower_http::trace::TraceLayer;

pub use health::STATUS_MESSAGE;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    imagegen: Arc<revision_imagegen::Server>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created or the
    /// inference client cannot be constructed
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let imagegen = revision_imagegen::build_server(config)?;
        Ok(Self::with_imagegen(config, imagegen))
    }

    /// Build the server around an already-constructed generation service
    pub fn with_imagegen(config: &Config, imagegen: Arc<revision_imagegen::Server>) -> Self {
        let listen_address = config.server.listen_address_or_default();

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Image generation routes
        app = app.merge(
            revision_imagegen::endpoint_router()
                .layer(DefaultBodyLimit::max(config.uploads.max_upload_bytes))
                .with_state(Arc::clone(&imagegen)),
        );

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS
        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Self {
            router: app,
            listen_address,
            imagegen,
        }
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered. The upload
    /// retention sweep, when configured, runs for the same lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let sweeper = self.imagegen.retention_policy().map(|(retention, interval)| {
            tracing::info!(?retention, ?interval, "upload retention enabled");
            revision_imagegen::uploads::spawn_retention_sweep(
                self.imagegen.uploads().clone(),
                retention,
                interval,
                shutdown.child_token(),
            )
        });

        let serve_shutdown = shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                serve_shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        if let Some(sweeper) = sweeper {
            shutdown.cancel();
            sweeper.await.ok();
        }

        Ok(())
    }
}
