use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use synapse_types::events::{ListenerScope, StoreEvent};

/// Buffered change events per listener before it starts lagging.
const EVENT_CAPACITY: usize = 1024;

/// Fans store changes out to live listeners and tracks which listeners exist.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every listener sees every change event
    broadcast_tx: broadcast::Sender<StoreEvent>,

    /// Live listeners: listener_id -> scope
    listeners: Mutex<HashMap<Uuid, ListenerScope>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                listeners: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to change events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast a change to all listeners.
    pub fn broadcast(&self, event: StoreEvent) {
        debug!("store change: {:?}", event);
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Record a new listener. Returns its listener_id.
    pub fn register(&self, scope: ListenerScope) -> Uuid {
        let listener_id = Uuid::new_v4();
        match self.inner.listeners.lock() {
            Ok(mut listeners) => {
                listeners.insert(listener_id, scope);
            }
            Err(e) => warn!("listener table lock poisoned: {}", e),
        }
        listener_id
    }

    /// Forget a listener. Returns false if it was already gone.
    pub fn unregister(&self, listener_id: Uuid) -> bool {
        match self.inner.listeners.lock() {
            Ok(mut listeners) => listeners.remove(&listener_id).is_some(),
            Err(e) => {
                warn!("listener table lock poisoned: {}", e);
                false
            }
        }
    }

    /// Number of live listeners for `scope`.
    pub fn live_listeners(&self, scope: &ListenerScope) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|listeners| listeners.values().filter(|s| *s == scope).count())
            .unwrap_or_default()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
