use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use geoip_enrich::config::LogFormat;
use geoip_enrich::{AppState, Config, GeoEnricher, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // The first argument overrides GEOIP_DATABASE_PATH
    let config = match Config::load(env::args().nth(1)) {
        Ok(config) => config,
        Err(e) => {
            // No validated filter or format yet, so report with the defaults
            init_tracing("info", LogFormat::default());
            error!("{e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };
    init_tracing(&config.log_level, config.log_format);

    info!("Starting GeoIP Enrich v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Install the global subscriber for the configured filter and format.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        database = %config.database_path.display(),
        forwarded_header = %config.forwarded_header,
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Configuration loaded"
    );

    // Open the database once; every request shares it
    let enricher = GeoEnricher::open(&config.database_path).map_err(|e| {
        error!("Failed to open GeoIP database: {e}");
        exitcode::NOINPUT
    })?;
    let database = enricher.database_info();
    info!(
        database_type = %database.database_type,
        build_epoch = database.build_epoch,
        ip_version = database.ip_version,
        "GeoIP database loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
        metrics::set_database_build_epoch(database.build_epoch);
    } else {
        info!("Prometheus metrics disabled (METRICS_PORT=0)");
    }

    // Build application state and router
    let state = AppState::new(enricher, config.clone());
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health       - Health check and database metadata");
    info!("  GET  /whoami       - Your own enrichment");
    info!("  GET  /lookup/{{ip}}  - Enrich an arbitrary address");

    // Peer addresses feed the resolver, so ConnectInfo is required
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}
