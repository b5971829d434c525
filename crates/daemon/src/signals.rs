//! Signal handling for graceful daemon shutdown.
//!
//! Listens for SIGTERM and SIGINT on Unix platforms and Ctrl+C on all
//! platforms, then fires the shared shutdown trigger.

use std::io;

use tracing::info;

use gitnotes_core::ShutdownTrigger;

/// Wait for a termination signal and request shutdown.
///
/// Resolves once a signal arrives or `trigger` is fired elsewhere.
pub async fn shutdown_on_signal(trigger: &ShutdownTrigger) -> io::Result<()> {
    let mut already = trigger.subscribe();

    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("received SIGTERM");
        }
        _ = already.wait_for(|stop| *stop) => return Ok(()),
    }

    trigger.trigger();
    Ok(())
}
