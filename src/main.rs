use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc, time::Duration};

use metrics_exporter_prometheus::PrometheusHandle;
use tasklane::{
    application::{error::AppError, repos::TasksRepo, tasks::TaskService},
    cache::{
        CacheBackend, CacheBackendKind, CacheConfig, MemoryCache, RedisCache, TaskListCache,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let (metrics, exporter) = telemetry::prometheus_metrics();

    let repositories = init_repositories(&settings).await?;
    let store: Arc<dyn TasksRepo> = repositories;

    let cache_config = CacheConfig::from(&settings.cache);
    let backend = init_cache_backend(&cache_config)?;
    let listings = Arc::new(TaskListCache::new(
        store.clone(),
        backend,
        &cache_config,
        metrics.clone(),
    ));
    info!(
        backend = ?cache_config.backend,
        enabled = listings.is_enabled(),
        ttl_seconds = cache_config.ttl_seconds,
        prefix = %cache_config.key_prefix,
        "Listing cache configured"
    );

    let tasks = Arc::new(TaskService::new(store.clone(), listings, metrics.clone()));
    let exporter = settings.metrics.enabled.then_some(exporter);

    if let Some((addr, handle)) = settings.metrics.addr.zip(exporter.clone()) {
        spawn_metrics_listener(addr, handle, settings.metrics.path.clone()).await?;
    }

    let state = ApiState {
        tasks,
        store,
        metrics,
        exporter,
    };

    serve_http(&settings, state).await
}

async fn spawn_metrics_listener(
    addr: SocketAddr,
    handle: PrometheusHandle,
    path: String,
) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %addr, path = %path, "Metrics listener started");

    let router = http::build_metrics_router(handle, &path);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router.into_make_service()).await {
            error!(error = %err, "metrics listener stopped");
        }
    });
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    if settings.database.run_migrations {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
        info!("Database migrations applied");
    }

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn init_cache_backend(config: &CacheConfig) -> Result<Option<Arc<dyn CacheBackend>>, AppError> {
    let backend: Option<Arc<dyn CacheBackend>> = match config.backend {
        CacheBackendKind::Disabled => None,
        CacheBackendKind::Memory => Some(Arc::new(MemoryCache::new(
            config.memory_capacity_non_zero(),
        ))),
        CacheBackendKind::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                InfraError::configuration("cache.redis_url is required for the redis backend")
            })?;
            let cache = RedisCache::from_url(url).map_err(InfraError::from)?;
            Some(Arc::new(cache))
        }
    };
    Ok(backend)
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    // A dedicated metrics listener takes the endpoint off the API router.
    let metrics_path = (settings.metrics.enabled && settings.metrics.addr.is_none())
        .then_some(settings.metrics.path.as_str());
    let router = http::build_router(state, metrics_path, settings.server.request_timeout);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "HTTP server listening");

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal.notify_one();
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(shutdown, grace) => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out; closing open connections");
        }
    }

    info!("HTTP server stopped");
    Ok(())
}

async fn drain_deadline(shutdown: Arc<Notify>, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received; draining connections");
}
