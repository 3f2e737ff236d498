//! Centralized shutdown management

use std::sync::Arc;

use tokio::sync::watch;

use crate::data::Store;

/// Coordinates graceful shutdown: signal handlers flip a watch flag, the
/// HTTP server drains, then the store is checkpointed and closed.
#[derive(Clone)]
pub struct ShutdownService {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    store: Arc<Store>,
}

impl ShutdownService {
    pub fn new(store: Arc<Store>) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            store,
        }
    }

    /// Subscribe to the shutdown signal
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Trigger shutdown
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Install SIGINT/SIGTERM handlers that trigger shutdown
    pub fn install_signal_handlers(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "Failed to listen for ctrl-c");
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sig) => {
                        sig.recv().await;
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to listen for SIGTERM"),
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate => {}
            }

            tracing::info!("Shutdown signal received");
            service.trigger();
        });
    }

    /// Finish shutdown: checkpoint and close the store.
    pub async fn shutdown(self) {
        tracing::debug!("Closing store...");
        if let Err(e) = self.store.checkpoint().await {
            tracing::warn!("Store checkpoint failed: {}", e);
        }
        if let Err(e) = self.store.close().await {
            tracing::warn!("Store close failed: {}", e);
        }
        tracing::debug!("Shutdown complete");
    }
}
