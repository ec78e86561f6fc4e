//! Translating termination signals into scheduler cancellation.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the cancellation token shared with the scheduler.
///
/// Cancelling the token makes the scheduler perform its final flush and
/// return; the process should exit only after awaiting that return.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the token to hand to the scheduler.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the token.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawns a task that cancels the token on Ctrl-C or, on Unix, SIGTERM.
    ///
    /// The task also ends when the token is cancelled by other means.
    pub fn listen(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                signal = wait_for_signal() => info!(signal, "Shutdown signal received"),
            }
            token.cancel();
        })
    }
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_cancels_token() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        assert!(!token.is_cancelled());

        coordinator.trigger();

        assert!(token.is_cancelled());
        assert!(coordinator.is_triggered());
    }

    #[tokio::test]
    async fn test_listener_ends_when_triggered() {
        let coordinator = ShutdownCoordinator::new();
        let listener = coordinator.listen();

        coordinator.trigger();

        listener.await.unwrap();
    }
}
