//! Entry point for the Piaget attendance declaration server.
//!
//! Loads configuration, opens the configured storage backend and serves the
//! HTTP API until Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use piaget_persistence::{
    EmbeddedPersistService, ExternalDbPersistService, PersistenceService, StorageMode,
};
use piaget_server::{
    middleware::rate_limit::{self, RateLimiterState},
    model::{AppState, Configuration},
    startup::{self, GracefulShutdown},
};
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;

    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    if configuration.token_secret_key().trim().is_empty() {
        anyhow::bail!("token secret key is empty; set piaget.auth.token.secret.key");
    }

    let storage_mode = configuration.persistence_mode();
    info!("Persistence mode: {}", storage_mode);

    let persistence: Arc<dyn PersistenceService> = match storage_mode {
        StorageMode::Embedded => {
            let data_dir = configuration.embedded_data_dir();
            info!(data_dir = %data_dir.display(), "Opening embedded store");
            Arc::new(EmbeddedPersistService::open(&data_dir)?)
        }
        StorageMode::ExternalDb => {
            let db = configuration.database_connection().await?;
            let service = ExternalDbPersistService::new(db);
            service.ensure_schema().await?;
            Arc::new(service)
        }
    };

    if let Err(e) = persistence.health_check().await {
        warn!("Storage health check failed at startup: {}", e);
    }

    let server_address = configuration.server_address();
    let server_port = configuration.server_port();
    let shutdown_timeout = Duration::from_secs(configuration.shutdown_timeout_seconds());

    let trusted_proxies = configuration.trusted_proxies();
    if !trusted_proxies.is_empty() {
        info!(?trusted_proxies, "Forwarding headers accepted from trusted proxies");
    }
    let rate_limit_state = Arc::new(
        RateLimiterState::new(configuration.rate_limit_config())
            .with_trusted_proxies(trusted_proxies),
    );
    let app_state = Arc::new(AppState::new(configuration, persistence)?);

    // Evict expired buckets and lockouts in the background
    let _rate_limit_cleanup_handle = rate_limit::start_cleanup_task(
        rate_limit_state.clone(),
        vec![
            app_state.login_limiter.clone(),
            app_state.lookup_limiter.clone(),
        ],
    );

    info!("Starting HTTP server on {}:{}", server_address, server_port);
    let server =
        startup::main_server(app_state, rate_limit_state, server_address, server_port)?;
    let server_handle = server.handle();

    let graceful = GracefulShutdown::new(startup::wait_for_shutdown_signal(), shutdown_timeout);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
                return Err(e.into());
            }
        }
        _ = graceful.wait_for_shutdown() => {
            server_handle.stop(true).await;
        }
    }

    info!("Piaget server stopped");
    Ok(())
}
