//! Disconnect notification.
//!
//! A connection holds a [`DisconnectNotifier`] and hands out
//! [`DisconnectWatch`] receivers. The watch resolves once the notifier fires
//! or is dropped, whichever comes first, so a connection that goes away
//! without saying so still wakes every watcher.

use tokio::sync::watch;

/// Creates a connected notifier/watch pair.
#[must_use]
pub fn channel() -> (DisconnectNotifier, DisconnectWatch) {
    let (tx, rx) = watch::channel(false);
    (DisconnectNotifier { tx }, DisconnectWatch { rx })
}

/// Sending half, owned by the connection.
#[derive(Debug)]
pub struct DisconnectNotifier {
    tx: watch::Sender<bool>,
}

impl DisconnectNotifier {
    /// Marks the connection closed and wakes every watcher.
    pub fn notify(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once [`notify`](Self::notify) has been called.
    #[must_use]
    pub fn is_notified(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a new watch on this notifier.
    #[must_use]
    pub fn watch(&self) -> DisconnectWatch {
        DisconnectWatch {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving half, cloned out to anyone waiting for the connection to close.
#[derive(Debug, Clone)]
pub struct DisconnectWatch {
    rx: watch::Receiver<bool>,
}

impl DisconnectWatch {
    /// Waits until the connection is closed.
    pub async fn closed(&mut self) {
        // Err means the notifier was dropped, which also counts as closed.
        let _ = self.rx.wait_for(|closed| *closed).await;
    }

    /// Returns true if the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }
}
