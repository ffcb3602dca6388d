use std::{future::IntoFuture, process, sync::Arc};

use property_listings::{
    application::{error::AppError, properties::PropertyStore},
    cache::{CacheConfig, CacheState, InvalidationListener, MetricsReporter, PropertyReader},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
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
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Metrics(_) => run_metrics(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let cache_config = CacheConfig::from(&settings.cache);
    let backend = property_listings::cache::connect_backend(&cache_config).await?;

    let store = Arc::new(PropertyStore::new(
        repositories.clone(),
        repositories.clone(),
    ));
    store.subscribe(Arc::new(InvalidationListener::new(backend.clone())));

    let reader = Arc::new(PropertyReader::new(
        backend.clone(),
        store.reader(),
        cache_config.aggregate_ttl,
    ));
    let reporter = Arc::new(MetricsReporter::new(backend));
    let cache = cache_config
        .enable_response_cache
        .then(|| CacheState::new(cache_config.clone()));

    let state = HttpState {
        reader,
        reporter,
        store,
        cache,
    };

    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!("Database migrations applied");
    Ok(())
}

async fn run_metrics(settings: config::Settings) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let backend = property_listings::cache::connect_backend(&cache_config).await?;
    let metrics = MetricsReporter::new(backend).get_cache_metrics().await?;

    let rendered = serde_json::to_string_pretty(&metrics)
        .map_err(|err| AppError::unexpected(format!("failed to encode metrics: {err}")))?;
    println!("{rendered}");
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

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "HTTP server listening");

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.notified().await }
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(error = %err, "failed to listen for shutdown signal");
            }
            info!(
                grace_seconds = settings.server.graceful_shutdown.as_secs(),
                "Shutdown requested, draining connections"
            );
            shutdown.notify_one();
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(result) => {
                    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?
                }
                Err(_) => warn!("Graceful shutdown timed out, dropping open connections"),
            }
        }
    }

    Ok(())
}
