//! Process termination handling.
//!
//! OS signals are folded into one [`CancellationToken`] that the active
//! transport watches.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Turns termination signals into a single cancellation.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Token cancelled when shutdown is triggered.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the token. Returns `true` only for the call that fired it.
    pub fn trigger(&self, reason: &str) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::info!(reason, "Shutdown already in progress, ignoring");
            return false;
        }

        tracing::info!(reason, "Shutting down");
        self.token.cancel();
        true
    }

    /// Install the signal handlers and spawn the listener task.
    ///
    /// Handlers are registered before this returns, so a signal delivered
    /// afterwards always reaches the coordinator.
    #[cfg(unix)]
    pub fn listen(&self) -> io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let coordinator = self.clone();

        Ok(tokio::spawn(async move {
            loop {
                let reason = tokio::select! {
                    Some(()) = interrupt.recv() => "SIGINT",
                    Some(()) = terminate.recv() => "SIGTERM",
                    else => break,
                };

                coordinator.trigger(reason);
            }
        }))
    }

    /// Spawn the ctrl-c listener task.
    #[cfg(not(unix))]
    pub fn listen(&self) -> io::Result<JoinHandle<()>> {
        let coordinator = self.clone();
        Ok(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                coordinator.trigger("ctrl-c");
            }
        }))
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
