//! Application wiring
//!
//! Startup order: config → store → pipeline (broker, alerters, processor)
//! → workers → HTTP server. Shutdown runs the other way round and closes
//! the store last so in-flight writers never observe a closed pool.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::alerters::{AlerterRegistry, ResultForwarder};
use crate::api::{self, ApiState};
use crate::core::cli;
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::broker::Broker;
use crate::data::SqliteService;
use crate::domain::MonitorHistorical;
use crate::probes::{MonitorWorker, Processor};
use crate::utils::time::BucketZone;
use crate::workers::{AggregateWorker, CleanupWorker};

pub struct App {
    config: AppConfig,
    store: Arc<SqliteService>,
    broker: Arc<Broker<MonitorHistorical>>,
    processor: Arc<Processor>,
    shutdown: ShutdownService,
}

impl App {
    /// Run the server with CLI/environment configuration. Startup failures
    /// (config parse, database open, migration) bubble up and exit
    /// non-zero.
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        app.start().await
    }

    async fn init(cli_config: &cli::CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli_config).context("failed to load configuration")?;

        tracing::info!(
            environment = %config.environment,
            monitors = config.monitors.len(),
            retention_days = config.retention_days,
            "configuration loaded"
        );

        if config.api_key.is_none() {
            tracing::warn!("API_KEY is not set; incident submission is open");
        }
        if config.timezone == BucketZone::Local {
            tracing::debug!("aggregate buckets follow the process-local timezone");
        }

        let store = Arc::new(
            SqliteService::init(&config.db_path)
                .await
                .context("failed to open database")?,
        );

        let broker = Arc::new(Broker::new());
        let alerters = Arc::new(AlerterRegistry::from_config(&config.alerting));
        let forwarder = config.webhook.as_ref().map(|w| {
            Arc::new(ResultForwarder::new(
                w.url.clone(),
                w.success_response,
                w.failed_response,
            ))
        });
        let processor = Arc::new(Processor::new(
            store.clone(),
            broker.clone(),
            alerters,
            forwarder,
        ));

        Ok(Self {
            config,
            store,
            broker,
            processor,
            shutdown: ShutdownService::new(),
        })
    }

    async fn start(self) -> Result<()> {
        self.shutdown.install_signal_handlers();
        self.start_background_tasks().await?;

        let state = ApiState {
            store: self.store.clone(),
            broker: self.broker.clone(),
            processor: self.processor.clone(),
            monitors: Arc::new(self.config.monitors.clone()),
            api_key: self.config.api_key.clone(),
            shutdown_rx: self.shutdown.subscribe(),
        };

        let router = api::server::router(state, self.config.static_path.clone());
        api::server::serve(
            router,
            &self.config.hostname,
            self.config.port,
            &self.shutdown,
        )
        .await?;

        self.shutdown.shutdown().await;
        self.store.close().await;

        Ok(())
    }

    async fn start_background_tasks(&self) -> Result<()> {
        // One worker per monitor
        for monitor in self.config.monitors.clone() {
            let id = monitor.id.clone();
            let name = monitor.name.clone();
            let worker = MonitorWorker::new(
                monitor,
                self.processor.clone(),
                self.store.clone(),
                self.config.dump_failure_response,
            )
            .with_context(|| format!("failed to set up monitor '{}'", id))?;

            tracing::info!(monitor_id = %id, name = %name, "registered monitor");
            self.shutdown
                .register(worker.spawn(self.shutdown.subscribe()))
                .await;
        }

        // Rollups across all monitors
        let aggregate = Arc::new(AggregateWorker::new(
            self.config.monitor_ids(),
            self.store.clone(),
            self.config.timezone,
        ));
        self.shutdown
            .register(aggregate.spawn_hourly(self.shutdown.subscribe()))
            .await;
        self.shutdown
            .register(aggregate.spawn_daily(self.shutdown.subscribe()))
            .await;

        // Retention
        let cleanup = CleanupWorker::new(self.store.clone(), self.config.retention_days);
        self.shutdown
            .register(cleanup.spawn(self.shutdown.subscribe()))
            .await;

        tracing::debug!("background tasks started");
        Ok(())
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
}
