use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use teloxide::Bot;
use tokio::sync::watch;
use tracing::{info, warn};

use forensics_core::config::AppConfig;
use forensics_detection::HttpAnalysisClient;
use forensics_notify::NoopGeoResolver;
use forensics_queue::JobQueue;
use forensics_sessions::SessionManager;
use forensics_store::{DuplicateIndex, HttpBlobStore, RateLimiter};
use forensics_telegram::{TelegramAdapter, TelegramProgressSink, TelegramResultSink};
use forensics_users::UserResolver;
use forensics_worker::{spawn_pool, AnalysesRepo, Worker};

mod app;
mod context;
mod http;

use context::GatewayContext;

/// Background sweep interval for expired conversations, stale duplicate
/// hashes, and completed/dead-letter jobs. The spec ties each TTL to its
/// own window (§4.2 1h, §4.1 24h, §4.3 result/failure TTLs); sweeping
/// hourly is frequent enough that none of them drift far past expiry.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forensics_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("FORENSICS_CONFIG").ok();
    let config = AppConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        panic!("config load failed: {e} (forensics.toml with a [telegram] bot_token is required)")
    });

    if let Some(parent) = Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let open_conn = || -> anyhow::Result<Connection> {
        Ok(Connection::open(&config.database.path)?)
    };

    let users_conn = open_conn()?;
    forensics_users::db::init_db(&users_conn)?;
    let sessions_conn = open_conn()?;
    forensics_sessions::db::init_db(&sessions_conn)?;
    let rate_conn = open_conn()?;
    forensics_store::db::init_db(&rate_conn)?;
    let dedup_conn = open_conn()?;
    forensics_store::db::init_db(&dedup_conn)?;
    let blob_conn = open_conn()?;
    forensics_store::db::init_db(&blob_conn)?;
    let queue_conn = open_conn()?;
    let analyses_conn = open_conn()?;

    let users = Arc::new(UserResolver::new(
        Arc::new(std::sync::Mutex::new(users_conn)),
        config.quota.daily_free_quota,
    ));
    let sessions = Arc::new(SessionManager::new(sessions_conn));
    let rate_limiter = Arc::new(RateLimiter::new(
        rate_conn,
        config.middleware.rate_capacity,
        config.middleware.rate_window_secs,
    ));
    let dedup = Arc::new(DuplicateIndex::new(
        dedup_conn,
        config.middleware.duplicate_window_hours,
    ));
    let blobs: Arc<dyn forensics_store::BlobStore> = Arc::new(HttpBlobStore::new(
        config.store.blob_base_url.clone(),
        config.analysis.timeout_secs,
        blob_conn,
    ));
    let queue = Arc::new(JobQueue::new(
        queue_conn,
        config.queue.retry_backoffs_secs.clone(),
        config.queue.max_pending_jobs,
    )?);
    let analyses = Arc::new(AnalysesRepo::new(analyses_conn)?);
    let analysis_client: Arc<dyn forensics_detection::AnalysisClient> = Arc::new(
        HttpAnalysisClient::new(config.analysis.base_url.clone(), config.analysis.timeout_secs),
    );
    let geo: Arc<dyn forensics_notify::GeoResolver> = Arc::new(NoopGeoResolver);

    let ctx = Arc::new(GatewayContext {
        sessions: sessions.clone(),
        users: users.clone(),
        queue: queue.clone(),
        blobs: blobs.clone(),
        dedup: dedup.clone(),
        rate_limiter: rate_limiter.clone(),
        geo: geo.clone(),
        analyses: analyses.clone(),
        max_upload_bytes: config.quota.max_upload_bytes,
        duplicate_window_hours: config.middleware.duplicate_window_hours,
    });

    let bot = Bot::new(&config.telegram.bot_token);
    let progress: Arc<dyn forensics_worker::ProgressSink> =
        Arc::new(TelegramProgressSink::new(bot.clone()));
    let results: Arc<dyn forensics_worker::ResultSink> =
        Arc::new(TelegramResultSink::new(bot.clone(), ctx.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers: Vec<Worker> = (0..config.gateway.worker_count)
        .map(|id| Worker {
            id,
            queue: queue.clone(),
            blobs: blobs.clone(),
            analysis_client: analysis_client.clone(),
            users: users.clone(),
            analyses: analyses.clone(),
            dedup: dedup.clone(),
            progress: progress.clone(),
            results: results.clone(),
            geo: geo.clone(),
            job_timeout: Duration::from_secs(config.queue.job_timeout_secs),
            analysis_timeout: Duration::from_secs(config.analysis.timeout_secs),
        })
        .collect();

    info!(workers = workers.len(), "spawning analysis worker pool");
    let worker_handles = spawn_pool(workers, shutdown_rx.clone());

    tokio::spawn(run_sweeps(
        sessions.clone(),
        dedup.clone(),
        queue.clone(),
        config.queue.result_ttl_secs,
        config.queue.failure_ttl_secs,
    ));

    let adapter = TelegramAdapter::new(&config.telegram, ctx.clone());
    tokio::spawn(adapter.run());

    let state = Arc::new(app::AppState {
        queue: queue.clone(),
        max_pending_jobs: config.queue.max_pending_jobs,
        worker_count: config.gateway.worker_count,
    });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!("forensics gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let serve = axum::serve(listener, router);

    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                warn!(error = %e, "HTTP server exited with an error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        let _ = handle.await;
    }

    Ok(())
}

/// Hourly janitor task: expires stale conversations, duplicate-hash
/// entries, and completed/dead-letter jobs (§4.1, §4.2, §4.3).
async fn run_sweeps(
    sessions: Arc<SessionManager>,
    dedup: Arc<DuplicateIndex>,
    queue: Arc<JobQueue>,
    result_ttl_secs: i64,
    failure_ttl_secs: i64,
) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = sessions.sweep_expired(3600) {
            warn!(error = %e, "conversation sweep failed");
        }
        if let Err(e) = dedup.sweep_expired() {
            warn!(error = %e, "duplicate-hash sweep failed");
        }
        if let Err(e) = queue.sweep_completed(result_ttl_secs) {
            warn!(error = %e, "completed-job sweep failed");
        }
        if let Err(e) = queue.sweep_dead_letters(failure_ttl_secs) {
            warn!(error = %e, "dead-letter sweep failed");
        }
    }
}
