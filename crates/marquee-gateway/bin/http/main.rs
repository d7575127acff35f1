mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use marquee_catalog::CatalogService;
use marquee_core::Catalog;
use marquee_gateway::{App, AppState};
use marquee_storage::{InMemoryStore, PgMovieStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormatArg::Pretty => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        request_timeout_ms = config.request_timeout_ms,
        "starting marquee gateway"
    );

    let catalog: Arc<dyn Catalog> = match config.storage {
        StorageBackendArg::InMemory => {
            let store = match &config.fixtures {
                Some(path) => InMemoryStore::load_fixtures(path)
                    .await
                    .with_context(|| format!("loading fixtures from {}", path.display()))?,
                None => InMemoryStore::new(),
            };
            if store.is_empty() {
                warn!("in-memory catalog is empty, pass --fixtures to load movies");
            }
            info!(movies = store.len(), "in-memory catalog ready");
            Arc::new(CatalogService::new(store))
        }
        StorageBackendArg::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("database url is required when storage backend is postgres")?;
            let store = PgMovieStore::connect(database_url, config.max_connections)
                .await
                .context("connecting to postgres")?;
            if config.migrate {
                store.migrate().await.context("running migrations")?;
                info!("migrations applied");
            }
            if config.fixtures.is_some() {
                warn!("fixtures are only loaded by the in-memory backend");
            }
            Arc::new(CatalogService::new(store))
        }
    };

    let shutdown = CancellationToken::new();
    let state = AppState::builder()
        .catalog(catalog)
        .request_timeout(Duration::from_millis(config.request_timeout_ms))
        .shutdown(shutdown.clone())
        .build();

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            shutdown.cancel();
        })
        .await
        .context("serving http")?;

    Ok(())
}
