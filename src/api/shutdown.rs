use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;

/// Shutdown signal shared by the server and the process signal listener.
pub struct ShutdownManager {
    shutdown: watch::Sender<bool>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { shutdown }
    }

    /// Resolves once shutdown has been signaled. Returns immediately if it
    /// already was.
    pub async fn signaled(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|down| *down).await;
    }

    pub fn signal_shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Shutdown signaled");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Spawns a task that signals shutdown on SIGINT or SIGTERM.
    pub fn listen_for_os_signals(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        tokio::select! {
                            _ = signal::ctrl_c() => {},
                            _ = sigterm.recv() => {},
                            _ = manager.signaled() => return,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to install SIGTERM handler: {}", e);
                        tokio::select! {
                            _ = signal::ctrl_c() => {},
                            _ = manager.signaled() => return,
                        }
                    }
                }
            }

            #[cfg(not(unix))]
            {
                tokio::select! {
                    _ = signal::ctrl_c() => {},
                    _ = manager.signaled() => return,
                }
            }

            manager.signal_shutdown();
        });
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
