//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::ApiState;
use super::routes::{health, otel, otlp};
use crate::core::CoreApp;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Build the full router: OTLP ingestion + query API + health.
    pub fn router(state: ApiState) -> Router {
        Router::new()
            .merge(otlp::routes())
            .merge(otel::routes())
            .route("/api/health", get(health::health))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve until shutdown is signalled. Returns the CoreApp so
    /// the caller can finish graceful shutdown (store checkpoint + close).
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        let addr = SocketAddr::new(
            app.config.server.host.parse()?,
            app.config.server.port,
        );

        let state = ApiState {
            store: app.store.clone(),
        };
        let router = Self::router(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %addr, "Listening");

        let mut shutdown_rx = app.shutdown.subscribe();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                // Wait for the shutdown flag to flip.
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        Ok(app)
    }
}
