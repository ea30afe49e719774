//! Keymetric Server — keyword and app intelligence pipeline
//!
//! Main entry point that wires all crates together and starts the
//! scheduled worker.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use keymetric_core::config::AppConfig;
use keymetric_core::error::AppError;
use keymetric_core::traits::notifier::Notifier;
use keymetric_entity::job_log::JobLogStore;
use keymetric_entity::task::TaskStore;
use keymetric_gateway::queue::RequestQueue;
use keymetric_gateway::{GatewayClient, ResultFetcher};
use keymetric_worker::jobs::{KeywordRefreshJob, SuggestionPlanJob, TicketPollJob};
use keymetric_worker::{CronScheduler, JobRunner, TicketPoller};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("KEYMETRIC_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Keymetric v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = keymetric_database::connection::DatabasePool::connect(&config.database).await?;
    if !db.health_check().await? {
        return Err(AppError::database("Database health check failed"));
    }
    keymetric_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Repositories ─────────────────────────────────────
    let task_repo: Arc<dyn TaskStore> = Arc::new(
        keymetric_database::repositories::task::TaskRepository::new(db.pool().clone()),
    );
    let job_log_repo: Arc<dyn JobLogStore> = Arc::new(
        keymetric_database::repositories::job_log::JobLogRepository::new(db.pool().clone()),
    );
    let notifier: Arc<dyn Notifier> = Arc::new(
        keymetric_database::repositories::notification::NotificationRepository::new(
            db.pool().clone(),
        ),
    );

    // ── Step 3: Gateway ──────────────────────────────────────────
    // The one queue every provider call in the process flows through;
    // the limiter and breaker behind it are not partitionable.
    let queue = RequestQueue::from_config(&config.gateway);
    let client = Arc::new(GatewayClient::new(
        config.gateway.clone(),
        Arc::clone(&queue),
    )?);
    tracing::info!(
        base_url = %config.gateway.base_url,
        requests_per_minute = config.gateway.requests_per_minute,
        "Gateway initialized"
    );

    // ── Step 4: Worker ───────────────────────────────────────────
    if !config.worker.enabled {
        tracing::warn!("Worker disabled, nothing to run");
        return Ok(());
    }

    let runner = Arc::new(JobRunner::new(
        Arc::clone(&job_log_repo),
        Arc::clone(&notifier),
    ));
    let poller = Arc::new(TicketPoller::new(
        Arc::clone(&task_repo),
        Arc::clone(&client) as Arc<dyn ResultFetcher>,
    ));

    let mut scheduler = CronScheduler::new(Arc::clone(&runner)).await?;
    scheduler
        .register(
            &config.worker.schedules.ticket_poll,
            Arc::new(TicketPollJob::new(Arc::clone(&poller), Arc::clone(&queue))),
        )
        .await?;
    scheduler
        .register(
            &config.worker.schedules.keyword_refresh,
            Arc::new(KeywordRefreshJob::new(
                Arc::clone(&client),
                Arc::clone(&task_repo),
                config.worker.watchlist.clone(),
                config.worker.max_poll_retries,
            )),
        )
        .await?;
    scheduler
        .register(
            &config.worker.schedules.suggestion_plan,
            Arc::new(SuggestionPlanJob::new(
                Arc::clone(&client),
                config.worker.watchlist.clone(),
            )),
        )
        .await?;
    scheduler.start().await?;

    tracing::info!(
        watchlist_keywords = config.worker.watchlist.keywords.len(),
        "Keymetric worker running"
    );

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping...");

    scheduler.shutdown().await?;
    db.close().await;

    tracing::info!("Keymetric shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
