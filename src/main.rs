use std::{sync::Arc, time::Duration};

use anyhow::Context;
use moviehub::{
    config::{load_config, LogFormat, LoggingConfig},
    db, rest, AppState,
};
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MOVIEHUB_CONFIG").ok())
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = load_config(&config_path)?;
    init_tracing(&config.logging);
    tracing::info!(environment = %config.environment, "loaded config from {}", config_path);

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to DB")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let app_state =
        AppState::new(pool.clone(), &config).context("Invalid password hashing parameters")?;

    if let Some(admin) = &config.auth.initial_admin {
        app_state
            .auth
            .ensure_admin(&admin.email, &admin.password, &admin.name)
            .await
            .context("Failed to seed initial admin")?;
    }

    let app = rest::router(app_state, &config.server);
    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    tracing::info!("REST API listening on {}", config.server.listen);

    // Once a signal arrives, in-flight requests get a bounded window to drain.
    let signalled = Arc::new(Notify::new());
    let notify = signalled.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                notify.notify_one();
            })
            .await
    });

    tokio::select! {
        res = &mut server => {
            if let Err(e) = res? {
                tracing::error!("REST server error: {}", e);
            }
        }
        _ = signalled.notified() => {
            tracing::info!("shutting down, draining in-flight requests");
            let grace = Duration::from_secs(config.server.shutdown_grace_secs);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(Ok(Ok(()))) => tracing::info!("server exited properly"),
                Ok(Ok(Err(e))) => tracing::error!("REST server error: {}", e),
                Ok(Err(e)) => tracing::error!("server task failed: {}", e),
                Err(_) => {
                    tracing::warn!("graceful shutdown window elapsed, aborting");
                    server.abort();
                }
            }
        }
    }

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
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
}
