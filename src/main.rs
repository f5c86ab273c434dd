use std::{net::SocketAddr, process, sync::Arc, time::Instant};

use chaptrack::{
    application::{
        analytics::AnalyticsService,
        chapters::ChapterService,
        error::AppError,
        repos::{ChaptersRepo, ChaptersWriteRepo},
    },
    cache::{CacheBackend, CacheConfig, CacheService, MemoryBackend, RedisBackend},
    config::{self, CacheBackendKind},
    infra::{
        db::{PoolLimits, PostgresRepositories},
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState},
        telemetry,
    },
};
use serde_json::Value;
use tokio::signal;
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Seed(args) => run_seed(settings, args).await,
    }
}

struct ApplicationContext {
    repositories: Arc<PostgresRepositories>,
    chapters: Arc<ChapterService>,
    analytics: Arc<AnalyticsService>,
    cache: CacheService,
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        std::time::Duration::from_secs(u64::from(settings.rate_limit.window_seconds.get())),
        settings.rate_limit.max_requests.get(),
    ));
    let sweeper = spawn_rate_limit_sweeper(rate_limiter.clone());

    let api_state = ApiState {
        chapters: app.chapters.clone(),
        analytics: app.analytics.clone(),
        store: app.repositories.clone(),
        cache: app.cache.clone(),
        admin_token: settings.auth.admin_token.as_deref().map(Arc::from),
        rate_limiter,
        started_at: Instant::now(),
    };
    if api_state.admin_token.is_none() {
        warn!(
            target = "chaptrack::serve",
            "No admin token configured; admin routes will reject every request"
        );
    }

    let result = serve_http(&settings, api_state).await;

    sweeper.abort();
    let _ = sweeper.await;
    app.repositories.close().await;
    info!(target = "chaptrack::serve", "Shutdown complete");

    result
}

async fn run_seed(settings: config::Settings, args: config::SeedArgs) -> Result<(), AppError> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let records = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(records)) => records,
        Ok(_) => {
            return Err(AppError::unexpected(format!(
                "{} must contain a JSON array of chapters",
                args.file.display()
            )));
        }
        Err(err) => {
            return Err(AppError::unexpected(format!(
                "failed to parse {}: {err}",
                args.file.display()
            )));
        }
    };

    let app = build_application_context(&settings).await?;

    if args.clear {
        let removed = app.chapters.clear().await?;
        info!(target = "chaptrack::seed", removed, "Cleared existing chapters");
    }

    let outcome = app.chapters.bulk_create(records).await;
    app.repositories.close().await;
    let report = outcome?;

    for failure in &report.failed {
        warn!(
            target = "chaptrack::seed",
            index = failure.index,
            error = %failure.error,
            "Chapter rejected"
        );
    }
    info!(
        target = "chaptrack::seed",
        path = %args.file.display(),
        inserted = report.successful.len(),
        failed = report.failed.len(),
        "Seeding finished"
    );
    Ok(())
}

async fn build_application_context(
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let repositories = init_repositories(settings).await?;
    let cache = init_cache(&settings.cache).await;

    let reader: Arc<dyn ChaptersRepo> = repositories.clone();
    let writer: Arc<dyn ChaptersWriteRepo> = repositories.clone();

    let chapters = Arc::new(ChapterService::new(
        reader.clone(),
        writer,
        cache.clone(),
    ));
    let analytics = Arc::new(AnalyticsService::new(reader, cache.clone()));

    Ok(ApplicationContext {
        repositories,
        chapters,
        analytics,
        cache,
    })
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let limits = PoolLimits {
        max_connections: settings.database.max_connections.get(),
        acquire_timeout: settings.database.acquire_timeout,
        statement_timeout: settings.database.statement_timeout,
    };
    let pool = PostgresRepositories::connect(database_url, limits)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(target = "chaptrack::db", "Connected to Postgres");
    Ok(Arc::new(PostgresRepositories::new(pool)))
}

/// An unreachable Redis leaves the service running uncached.
async fn init_cache(settings: &config::CacheSettings) -> CacheService {
    let cache_config = CacheConfig::from(settings);

    let backend: Arc<dyn CacheBackend> = match settings.backend {
        CacheBackendKind::Disabled => {
            info!(target = "chaptrack::cache", "Caching disabled by configuration");
            return CacheService::disabled(cache_config);
        }
        CacheBackendKind::Memory => Arc::new(MemoryBackend::new(settings.memory_capacity)),
        CacheBackendKind::Redis => {
            match RedisBackend::connect(&settings.redis_url, settings.connect_timeout).await {
                Ok(backend) => Arc::new(backend),
                Err(err) => {
                    warn!(
                        target = "chaptrack::cache",
                        error = %err,
                        "Redis unavailable; continuing without cache"
                    );
                    return CacheService::disabled(cache_config);
                }
            }
        }
    };

    CacheService::new(backend, cache_config)
}

fn spawn_rate_limit_sweeper(limiter: Arc<ApiRateLimiter>) -> tokio::task::JoinHandle<()> {
    let period = limiter.window();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            limiter.sweep();
        }
    })
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let body_limit = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| AppError::unexpected("uploads.max_request_bytes does not fit in memory"))?;
    let router = http::build_router(api_state, body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "chaptrack::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    // in-flight requests get `graceful_shutdown` to drain after the signal
    let serve = async {
        server
            .await
            .map_err(|err| AppError::unexpected(format!("server error: {err}")))
    };
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => result,
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "chaptrack::serve",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(target = "chaptrack::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "chaptrack::serve", error = %err, "failed to listen for SIGTERM");
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
    info!(target = "chaptrack::serve", "Shutdown signal received");
}
