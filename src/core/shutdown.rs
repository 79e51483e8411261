//! # OS termination signals.
//!
//! [`shutdown_signal`] completes when the process is asked to stop:
//! `SIGINT`, `SIGTERM` or `SIGQUIT` on Unix, Ctrl-C elsewhere.
//!
//! If the listeners cannot be installed the future never completes; the line
//! keeps running and only stops when every worker has ended.

use std::future::pending;

use tracing::{info, warn};

/// Resolves once a termination signal arrives.
pub(crate) async fn shutdown_signal() {
    match wait_for_signal().await {
        Ok(name) => info!(signal = name, "termination signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for termination signals");
            pending::<()>().await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
