use async_trait::async_trait;
use tokio::sync::mpsc;

use synapse_types::api::{ChannelSummary, NewChannel, NewMessage, OrderBy};
use synapse_types::error::{RemoteError, StorageError};
use synapse_types::models::{Channel, Identity, Message};

/// One push from a store listener: a full snapshot, or the reason it could not be read.
pub type SnapshotResult<T> = Result<Vec<T>, RemoteError>;

/// Delivery end handed to a store when a listener is registered.
/// The store pushes every snapshot here, in the order it produces them.
pub struct SnapshotSink<T> {
    tx: mpsc::UnboundedSender<SnapshotResult<T>>,
}

impl<T> SnapshotSink<T> {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SnapshotResult<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push a snapshot. Returns false once the consumer is gone.
    pub fn deliver(&self, snapshot: SnapshotResult<T>) -> bool {
        self.tx.send(snapshot).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for SnapshotSink<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Handle to a live store listener. Consuming it releases the listener, so a
/// registration can be released at most once.
pub trait ListenerRegistration: Send + Sync {
    fn remove(self: Box<Self>);
}

/// Remote document store holding channels and their messages.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Push the channel collection to `sink` now and after every change.
    fn listen_channels(
        &self,
        order: OrderBy,
        sink: SnapshotSink<Channel>,
    ) -> Result<Box<dyn ListenerRegistration>, RemoteError>;

    /// Push one channel's messages to `sink` now and after every change.
    fn listen_messages(
        &self,
        channel_id: &str,
        order: OrderBy,
        sink: SnapshotSink<Message>,
    ) -> Result<Box<dyn ListenerRegistration>, RemoteError>;

    /// Returns the store-assigned channel id.
    async fn add_channel(&self, channel: NewChannel) -> Result<String, RemoteError>;

    async fn get_channel(&self, id: &str) -> Result<Option<Channel>, RemoteError>;

    /// Returns the store-assigned message id.
    async fn add_message(&self, message: NewMessage) -> Result<String, RemoteError>;

    async fn merge_channel_summary(
        &self,
        channel_id: &str,
        summary: ChannelSummary,
    ) -> Result<(), RemoteError>;
}

/// Remote anonymous authentication.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Cached principal; may be stale.
    fn current_user(&self) -> Option<Identity>;

    async fn sign_in_anonymously(&self) -> Result<Identity, RemoteError>;

    async fn sign_out(&self) -> Result<(), RemoteError>;
}

/// Local durable string storage. Calls may block.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}
