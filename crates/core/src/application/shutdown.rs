// Shutdown signalling for long-running consumers

use tokio::sync::watch;

/// Observed by every subscription loop. Cloning is cheap.
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested (or the sender is gone)
    pub async fn wait(&mut self) {
        // wait_for returns immediately if the value is already true
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Owned by whoever decides when to stop (signal handler, dispatcher on
/// fatal error)
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    pub fn shutdown(&self) {
        // send_replace stores the flag even when no token is alive yet
        self.tx.send_replace(true);
    }

    /// Another token bound to this sender
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}
