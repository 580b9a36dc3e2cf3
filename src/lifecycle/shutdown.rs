//! Shutdown coordination for the proxy.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the HTTP server subscribes to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the proxy stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// SIGINT or SIGTERM.
    Interrupted,
    /// The spawned engine exited with this code.
    EngineExited(i32),
    /// The HTTP server returned on its own.
    ServerStopped,
}

impl ExitReason {
    /// Process exit code for this reason.
    pub fn code(self) -> i32 {
        match self {
            ExitReason::Interrupted | ExitReason::ServerStopped => 0,
            ExitReason::EngineExited(code) => code,
        }
    }
}
