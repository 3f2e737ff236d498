//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::{Store, backfill};

/// The runtime value: everything the server needs, constructed once in
/// `run` and injected into the API layer. No import-time globals.
pub struct CoreApp {
    pub config: AppConfig,
    pub storage: AppStorage,
    pub store: Arc<Store>,
    pub shutdown: ShutdownService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        let (cli_config, command) = cli::parse();

        match command {
            Some(Commands::Backfill { limit, max_batches }) => {
                let app = Self::init(&cli_config).await?;
                app.run_backfill(limit, max_batches).await
            }
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli);
        let storage = AppStorage::init(&config).await?;
        let store = Arc::new(Store::init(&storage).await?);
        let shutdown = ShutdownService::new(store.clone());

        Ok(Self {
            config,
            storage,
            store,
            shutdown,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_level(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        app.shutdown.install_signal_handlers();

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            data_dir = %app.storage.data_dir().display(),
            "Starting server"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    /// Run bounded backfill batches until nothing is pending (or the batch
    /// cap is reached), one transaction per batch.
    async fn run_backfill(&self, limit: i64, max_batches: Option<u32>) -> Result<()> {
        let mut batches: u32 = 0;
        let mut total: u64 = 0;

        loop {
            let updated = self
                .store
                .run(move |conn| backfill::backfill_derived_span_columns(conn, limit))
                .await?;
            total += updated;
            batches += 1;

            tracing::info!(batch = batches, updated, "Backfill batch complete");

            if updated == 0 || max_batches.is_some_and(|m| batches >= m) {
                break;
            }
        }

        println!("Backfilled {total} span rows in {batches} batch(es).");
        self.store.checkpoint().await?;
        Ok(())
    }
}
