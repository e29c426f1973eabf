use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::{
    services::{health, list_downloads, login, register, session_status, submit_download},
    state::AppState,
};
use crate::auth::{TokenService, require_auth};
use crate::config::Config;
use crate::ledger::Ledger;
use crate::queue::{JobBroker, JobEnvelope};
use crate::worker::{FetchClient, FetchConfig, WorkerContext, spawn_workers};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

const PRUNE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Build the application router. Split out of [`run`] so tests can drive
/// the exact same routes and middleware in-process.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/downloads", post(submit_download).get(list_downloads))
        .route("/session/status", get(session_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    // Load config
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
    let address = address.unwrap_or(config.server.bind_addr);

    // Open ledger
    info!(path = %config.server.ledger_path.display(), "Opening ledger");
    let store = Ledger::open(&config.server.ledger_path)
        .map_err(|e| format!("Failed to open ledger: {}", e))?;

    // Reconcile rows left behind by a previous run before accepting traffic
    let recovered = store
        .sweep_incomplete()
        .map_err(|e| format!("Failed to sweep ledger: {}", e))?;

    // Token service from the environment-provided secret (validated at load)
    let secret = config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or("JWT secret missing after validation")?;
    let tokens = TokenService::new(secret, config.auth.token_ttl_secs);

    // Worker pool plumbing
    let (broker, worker_receivers) =
        JobBroker::new(config.download.workers, config.download.queue_depth);
    let broker = Arc::new(broker);

    let fetch_config = FetchConfig {
        connect_timeout: Duration::from_secs(config.download.connect_timeout_secs),
        request_timeout: Duration::from_secs(config.download.fetch_timeout_secs),
        max_file_bytes: config.download.max_file_bytes.as_u64(),
        user_agent: config.download.user_agent.clone(),
    };
    let fetcher =
        Arc::new(FetchClient::new(&fetch_config).map_err(|e| format!("HTTP client: {}", e))?);

    let download_dir = config.download.dir.clone();
    let job_ttl_days = config.retention.job_ttl_days;

    let state = AppState::new(config, store, tokens, broker.clone());

    let worker_ctx = WorkerContext {
        ledger: state.store.clone(),
        fetcher,
        download_dir,
        metrics: state.metrics.clone(),
    };
    let _workers = spawn_workers(worker_receivers, worker_ctx);

    // Re-dispatch jobs that never reached a worker before the last shutdown
    for job in recovered.requeue {
        broker.dispatch(JobEnvelope { job_id: job.id }).await;
    }

    spawn_prune_task(state.store.clone(), job_ttl_days);

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "vidgrab API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Retention loop: prune expired terminal jobs at startup and daily.
fn spawn_prune_task(store: Arc<Ledger>, job_ttl_days: u32) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            match store.prune_expired(job_ttl_days) {
                Ok(stats) => {
                    if stats.jobs_pruned > 0 {
                        info!(jobs_pruned = stats.jobs_pruned, "Retention prune finished");
                    }
                }
                Err(e) => error!(error = %e, "Retention prune failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
