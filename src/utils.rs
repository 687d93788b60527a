//! Process-level helpers.

use tokio::signal;
use tracing::{error, warn};

/// Resolve once the process is asked to stop (Ctrl+C or SIGTERM).
///
/// Passed to `axum::serve(..).with_graceful_shutdown`, so in-flight requests
/// finish before the listener closes. The database needs no teardown.
///
/// # Panics
///
/// Panics if a signal handler cannot be installed. Without it the process
/// could only be stopped with SIGKILL.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            panic!("Critical: cannot install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                panic!("Critical: cannot install SIGTERM signal handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    warn!(signal = signal_name, "Shutdown requested, draining in-flight requests");
}
