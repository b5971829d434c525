//! Shutdown signalling shared by the flush loop and its owner.

use tokio::sync::watch;
use tracing::info;

/// Receiving side, handed to the flush loop.
pub type ShutdownSignal = watch::Receiver<bool>;

/// Sending side. Dropping it also counts as a shutdown request.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Ask every holder of a [`ShutdownSignal`] to stop.
    pub fn trigger(&self) {
        if !*self.tx.borrow() {
            info!("shutdown requested");
        }
        self.tx.send_replace(true);
    }

    /// A fresh receiver for another task.
    pub fn subscribe(&self) -> ShutdownSignal {
        self.tx.subscribe()
    }
}

/// Create a connected trigger / signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, rx)
}

/// Check whether shutdown has been requested.
pub fn is_shutdown_requested(signal: &ShutdownSignal) -> bool {
    *signal.borrow()
}
