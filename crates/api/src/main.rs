//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use domain::{DirectorySeed, InMemoryDirectory};
use event_store::InMemoryEventStore;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("invalid configuration");

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load reference data
    let directory = match &config.directory_file {
        Some(path) => {
            let seed = DirectorySeed::from_file(path)
                .await
                .expect("failed to load directory file");
            tracing::info!(
                %path,
                products = seed.products.len(),
                tables = seed.tables.len(),
                waiters = seed.waiters.len(),
                "directory loaded"
            );
            InMemoryDirectory::from_seed(seed)
        }
        None => {
            tracing::warn!("DIRECTORY_FILE not set, starting with an empty directory");
            InMemoryDirectory::new()
        }
    };

    // 4. Create event store and application state
    let state = api::create_default_state(InMemoryEventStore::new(), &config, Arc::new(directory));

    // 5. Start the delay scanner
    let (stop_tx, stop_rx) = watch::channel(false);
    let scanner = config.delay_scan_interval().map(|interval| {
        api::scheduler::spawn_delay_scanner(
            Arc::clone(&state.coordinator),
            config.delay_threshold_minutes,
            interval,
            stop_rx,
        )
    });

    // 6. Build the application and serve
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = stop_tx.send(true);
    if let Some(scanner) = scanner
        && let Err(e) = scanner.await
    {
        tracing::error!(error = %e, "delay scanner task failed");
    }

    tracing::info!("server shut down gracefully");
}
