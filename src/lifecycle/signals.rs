//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Funnel signals and panics into the shutdown coordinator
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every path goes through `ShutdownCoordinator::trigger`, which is
//!   idempotent, so racing signals are safe

use std::sync::Arc;

use crate::host::Host;

/// Wait for a termination signal and trigger shutdown with its cause.
pub async fn listen(host: Arc<Host>) {
    let cause = wait_for_signal().await;
    host.shutdown().trigger(cause);
}

/// Route panics into the shutdown coordinator before the default handler.
pub fn install_panic_hook(host: &Arc<Host>) {
    let host = host.clone();
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        host.shutdown().trigger("panic");
        previous(info);
    }));
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
