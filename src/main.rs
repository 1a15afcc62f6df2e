use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};

use calculator_service::{
    api::{self, AppState},
    args::Args,
    config::Config,
    history::{HistoryStore, InMemoryHistoryStore, SqliteHistoryStore},
    logging::{self, SERVICE_NAME},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env()?;
    args.apply(&mut config);

    let _guards = logging::init(&config.log_dir)?;

    let result = run(config, args.in_memory)
        .instrument(info_span!("service", name = SERVICE_NAME))
        .await;

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Service stopped with an error");
    }
    result
}

async fn run(config: Config, in_memory: bool) -> Result<()> {
    let sqlite = if in_memory {
        None
    } else {
        Some(SqliteHistoryStore::connect(&config.database).await?)
    };

    let store: Arc<dyn HistoryStore> = match &sqlite {
        Some(sqlite) => Arc::new(sqlite.clone()),
        None => {
            info!("Using in-memory history");
            Arc::new(InMemoryHistoryStore::new(config.database.name.clone()))
        }
    };

    let app = api::router(AppState::new(store));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Calculator service is running on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some(sqlite) = sqlite {
        sqlite.close().await;
    }
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received");
}
