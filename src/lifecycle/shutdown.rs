//! Shutdown coordination.

use tokio::sync::watch;

/// Coordinator for shutting down long-running tasks.
///
/// Backed by a watch channel, so a task that subscribes after the trigger
/// still observes it.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new, untriggered coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown. Returns false if it was already triggered.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|triggered| !std::mem::replace(triggered, true))
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait until shutdown is triggered. Returns immediately if it already was.
    pub async fn recv(&mut self) {
        // An Err means the coordinator is gone, which is shutdown as well.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}
