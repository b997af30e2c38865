use std::{process, sync::Arc, time::Duration};

use scriptorium::{
    application::{
        auth::{AuthService, CreateAdminCommand},
        error::AppError,
        images::ImageStore,
        posts::ContentRepository,
        side_effects::TracingSink,
    },
    cache::{CacheConfig, CacheStore, MemoryCache, RedisCache},
    config::{self, CacheBackend},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, SessionSettings},
        telemetry,
        uploads::FsImageStore,
    },
};
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

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateAdmin(args) => run_create_admin(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = init_cache(&settings).await?;

    let images: Arc<dyn ImageStore> = Arc::new(
        FsImageStore::new(settings.uploads.directory.clone()).map_err(InfraError::from)?,
    );
    let cache_config = CacheConfig::from(&settings.cache);
    let content = ContentRepository::new(
        Arc::new(repositories.clone()),
        cache,
        images.clone(),
        Arc::new(TracingSink),
        cache_config.ttls,
    );
    let auth = build_auth_service(&settings, &repositories)?;

    let state = ApiState {
        content: Arc::new(content),
        auth: Arc::new(auth),
        images,
        health: Arc::new(repositories),
        session: SessionSettings {
            cookie_secure: settings.auth.cookie_secure,
            admin_api_key: settings.auth.admin_api_key.as_deref().map(Arc::from),
        },
        max_upload_bytes: usize::try_from(settings.uploads.max_request_bytes.get())
            .unwrap_or(usize::MAX),
    };

    if state.session.admin_api_key.is_none() {
        warn!("auth.admin_api_key is unset; admin bootstrap route will refuse every request");
    }

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(addr = %settings.server.addr, "Listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("Server stopped");
    Ok(())
}

async fn run_create_admin(
    settings: config::Settings,
    args: config::CreateAdminArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let auth = build_auth_service(&settings, &repositories)?;

    let admin = auth
        .create_admin(CreateAdminCommand {
            username: args.username,
            email: args.email,
            password: args.password,
        })
        .await?;

    info!(admin_id = admin.id, username = %admin.username, "Admin created");
    Ok(())
}

async fn init_repositories(settings: &config::Settings) -> Result<PostgresRepositories, AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database.url must be set"))?;

    let pool = PostgresRepositories::connect(
        url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(InfraError::from)?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(PostgresRepositories::new(pool))
}

async fn init_cache(settings: &config::Settings) -> Result<Arc<dyn CacheStore>, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    match cache_config.backend {
        CacheBackend::Memory => {
            info!(capacity = cache_config.memory_capacity.get(), "Using in-memory cache");
            Ok(Arc::new(MemoryCache::new(cache_config.memory_capacity)))
        }
        CacheBackend::Redis => {
            let url = cache_config
                .redis_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.redis_url must be set"))?;
            let cache = RedisCache::connect(url, cache_config.operation_timeout)
                .await
                .map_err(InfraError::from)?;
            info!("Using redis cache");
            Ok(Arc::new(cache))
        }
    }
}

fn build_auth_service(
    settings: &config::Settings,
    repositories: &PostgresRepositories,
) -> Result<AuthService, AppError> {
    let secret = settings
        .auth
        .require_jwt_secret()
        .map_err(|err| InfraError::configuration(err.to_string()))?;

    Ok(AuthService::new(
        Arc::new(repositories.clone()),
        secret.as_bytes(),
        settings.auth.token_ttl(),
    ))
}

async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(
        grace_seconds = grace.as_secs(),
        "Shutdown requested; draining connections"
    );
    // Force exit if in-flight requests outlive the grace period.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("Graceful shutdown timed out");
        process::exit(1);
    });
}
