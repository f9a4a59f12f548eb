use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

/// Single-consumer queue for discrete UI events (navigation, toasts).
/// Each event is delivered once; re-reading view state never replays it.
pub struct EventQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<T>>>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn publish(&self, event: T) {
        if self.tx.send(event).is_err() {
            debug!("event dropped: consumer is gone");
        }
    }

    /// Hand out the receiving end. Only the first caller gets it.
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<T>> {
        self.rx.lock().ok().and_then(|mut rx| rx.take())
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
