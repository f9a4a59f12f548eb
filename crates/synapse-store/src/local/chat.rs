use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use synapse_db::Database;
use synapse_db::models::{ChannelRow, MessageRow};
use synapse_types::api::{ChannelSummary, NewChannel, NewMessage, OrderBy};
use synapse_types::error::RemoteError;
use synapse_types::events::{ListenerScope, StoreEvent};
use synapse_types::models::{Channel, Message, MessageType};

use super::blocking;
use crate::boundary::{ChatStore, ListenerRegistration, SnapshotResult, SnapshotSink};
use crate::dispatcher::Dispatcher;

/// Chat store over a local SQLite database. Every write is announced on the
/// dispatcher and each live listener answers by re-reading a full snapshot.
#[derive(Clone)]
pub struct LocalChatStore {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl LocalChatStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_dispatcher(db, Dispatcher::new())
    }

    /// Share a dispatcher so several store handles see each other's writes.
    pub fn with_dispatcher(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn spawn_listener<T, L>(
        &self,
        scope: ListenerScope,
        sink: SnapshotSink<T>,
        load: L,
    ) -> Result<Box<dyn ListenerRegistration>, RemoteError>
    where
        T: Send + 'static,
        L: Fn(&Database) -> anyhow::Result<Vec<T>> + Clone + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RemoteError::Unavailable(format!("no async runtime: {}", e)))?;

        // Subscribe before the first read so no change can slip between the two.
        let mut events = self.dispatcher.subscribe();
        let listener_id = self.dispatcher.register(scope.clone());
        let db = self.db.clone();

        debug!("listener {} registered for {:?}", listener_id, scope);

        let handle = runtime.spawn(async move {
            if !push_snapshot(&db, &sink, load.clone()).await {
                return;
            }

            loop {
                match events.recv().await {
                    Ok(event) if event.affects(&scope) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(n)) => {
                        // Snapshots are total, so one re-read covers everything missed.
                        warn!("listener for {:?} lagged by {} events", scope, n);
                    }
                    Err(RecvError::Closed) => break,
                }

                if !push_snapshot(&db, &sink, load.clone()).await {
                    break;
                }
            }
        });

        Ok(Box::new(LocalRegistration {
            listener_id,
            dispatcher: self.dispatcher.clone(),
            handle,
        }))
    }
}

/// Returns false once the consumer has gone away.
async fn push_snapshot<T, L>(db: &Arc<Database>, sink: &SnapshotSink<T>, load: L) -> bool
where
    T: Send + 'static,
    L: FnOnce(&Database) -> anyhow::Result<Vec<T>> + Send + 'static,
{
    if sink.is_closed() {
        return false;
    }
    let snapshot: SnapshotResult<T> = blocking(db, load)
        .await
        .map_err(|e| RemoteError::Listener(e.to_string()));
    sink.deliver(snapshot)
}

/// Releases the listener task and its dispatcher entry when dropped.
struct LocalRegistration {
    listener_id: Uuid,
    dispatcher: Dispatcher,
    handle: JoinHandle<()>,
}

impl ListenerRegistration for LocalRegistration {
    fn remove(self: Box<Self>) {
        // Drop aborts the task and unregisters from the dispatcher.
        drop(self);
    }
}

impl Drop for LocalRegistration {
    fn drop(&mut self) {
        self.handle.abort();
        if self.dispatcher.unregister(self.listener_id) {
            debug!("listener {} removed", self.listener_id);
        }
    }
}

#[async_trait]
impl ChatStore for LocalChatStore {
    fn listen_channels(
        &self,
        order: OrderBy,
        sink: SnapshotSink<Channel>,
    ) -> Result<Box<dyn ListenerRegistration>, RemoteError> {
        self.spawn_listener(ListenerScope::Channels, sink, move |db: &Database| {
            Ok(db.list_channels(order)?.into_iter().map(channel_from_row).collect())
        })
    }

    fn listen_messages(
        &self,
        channel_id: &str,
        order: OrderBy,
        sink: SnapshotSink<Message>,
    ) -> Result<Box<dyn ListenerRegistration>, RemoteError> {
        let cid = channel_id.to_string();
        self.spawn_listener(
            ListenerScope::Messages(channel_id.to_string()),
            sink,
            move |db: &Database| {
                Ok(db.list_messages(&cid, order)?.into_iter().map(message_from_row).collect())
            },
        )
    }

    async fn add_channel(&self, channel: NewChannel) -> Result<String, RemoteError> {
        let id = Uuid::new_v4().to_string();
        let row = ChannelRow {
            id: id.clone(),
            name: channel.name,
            description: channel.description,
            created_by: channel.created_by,
            created_at_ms: channel.created_at.timestamp_millis(),
            last_message_text: None,
            last_message_ms: None,
        };

        blocking(&self.db, move |db| db.insert_channel(&row)).await?;

        info!("channel {} created", id);
        self.dispatcher.broadcast(StoreEvent::ChannelsChanged);
        Ok(id)
    }

    async fn get_channel(&self, id: &str) -> Result<Option<Channel>, RemoteError> {
        let id = id.to_string();
        let row = blocking(&self.db, move |db| db.get_channel(&id)).await?;
        Ok(row.map(channel_from_row))
    }

    async fn add_message(&self, message: NewMessage) -> Result<String, RemoteError> {
        let id = Uuid::new_v4().to_string();
        let channel_id = message.channel_id.clone();
        let row = MessageRow {
            id: id.clone(),
            channel_id: message.channel_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            text: message.text,
            image_url: message.image_url,
            timestamp_ms: message.timestamp.timestamp_millis(),
            kind: message.kind.as_str().to_string(),
        };

        let inserted = blocking(&self.db, move |db| {
            if db.get_channel(&row.channel_id)?.is_none() {
                return Ok(false);
            }
            db.insert_message(&row)?;
            Ok(true)
        })
        .await?;

        if !inserted {
            return Err(RemoteError::NotFound(format!("channel {}", channel_id)));
        }

        self.dispatcher.broadcast(StoreEvent::MessagesChanged { channel_id });
        Ok(id)
    }

    async fn merge_channel_summary(
        &self,
        channel_id: &str,
        summary: ChannelSummary,
    ) -> Result<(), RemoteError> {
        let cid = channel_id.to_string();
        let updated = blocking(&self.db, move |db| {
            db.update_channel_summary(
                &cid,
                &summary.last_message_text,
                summary.last_message_timestamp.timestamp_millis(),
            )
        })
        .await?;

        if !updated {
            return Err(RemoteError::NotFound(format!("channel {}", channel_id)));
        }

        self.dispatcher.broadcast(StoreEvent::ChannelsChanged);
        Ok(())
    }
}

fn millis_to_utc(ms: i64, what: &str, id: &str) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(|| {
        warn!("Corrupt {} '{}' on '{}'", what, ms, id);
        DateTime::default()
    })
}

fn channel_from_row(row: ChannelRow) -> Channel {
    Channel {
        created_at: millis_to_utc(row.created_at_ms, "created_at", &row.id),
        last_message_timestamp: row
            .last_message_ms
            .map(|ms| millis_to_utc(ms, "last_message_ms", &row.id)),
        id: row.id,
        name: row.name,
        description: row.description,
        created_by: row.created_by,
        last_message_text: row.last_message_text,
    }
}

fn message_from_row(row: MessageRow) -> Message {
    let kind = MessageType::parse(&row.kind).unwrap_or_else(|| {
        warn!("Corrupt message type '{}' on message '{}'", row.kind, row.id);
        MessageType::Text
    });
    Message {
        timestamp: millis_to_utc(row.timestamp_ms, "timestamp", &row.id),
        kind,
        id: row.id,
        channel_id: row.channel_id,
        sender_id: row.sender_id,
        sender_name: row.sender_name,
        text: row.text,
        image_url: row.image_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    fn store() -> LocalChatStore {
        LocalChatStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn new_channel(name: &str) -> NewChannel {
        NewChannel {
            name: name.to_string(),
            description: None,
            created_by: Some("u1".to_string()),
            created_at: Utc::now(),
        }
    }

    fn new_message(channel_id: &str, text: &str, timestamp: DateTime<Utc>) -> NewMessage {
        NewMessage {
            channel_id: channel_id.to_string(),
            sender_id: "u1".to_string(),
            sender_name: "Anonymous".to_string(),
            text: Some(text.to_string()),
            image_url: None,
            timestamp,
            kind: MessageType::Text,
        }
    }

    async fn next<T>(rx: &mut UnboundedReceiver<SnapshotResult<T>>) -> Vec<T> {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("snapshot timed out")
            .expect("sink closed")
            .expect("snapshot failed")
    }

    #[tokio::test]
    async fn channel_listener_pushes_initial_and_changed_snapshots() {
        let store = store();
        let (sink, mut rx) = SnapshotSink::channel();
        let registration = store.listen_channels(OrderBy::CHANNELS, sink).unwrap();

        assert!(next(&mut rx).await.is_empty());

        let id = store.add_channel(new_channel("general")).await.unwrap();
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].name, "general");

        registration.remove();
        assert_eq!(store.dispatcher().live_listeners(&ListenerScope::Channels), 0);
    }

    #[tokio::test]
    async fn message_write_then_summary_reorders_channels() {
        let store = store();
        let quiet = store.add_channel(new_channel("quiet")).await.unwrap();
        let busy = store.add_channel(new_channel("busy")).await.unwrap();

        let at = Utc::now();
        let message = new_message(&busy, "hi", at);
        let summary = message.summary();
        store.add_message(message).await.unwrap();
        store.merge_channel_summary(&busy, summary).await.unwrap();

        let (sink, mut rx) = SnapshotSink::channel();
        let _registration = store.listen_channels(OrderBy::CHANNELS, sink).unwrap();
        let ids: Vec<String> = next(&mut rx).await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, [busy.clone(), quiet]);

        let busy = store.get_channel(&busy).await.unwrap().unwrap();
        assert_eq!(busy.last_message_text.as_deref(), Some("hi"));
        assert_eq!(busy.last_message_timestamp.map(|t| t.timestamp_millis()), Some(at.timestamp_millis()));
    }

    #[tokio::test]
    async fn message_listener_only_sees_its_channel() {
        let store = store();
        let c1 = store.add_channel(new_channel("one")).await.unwrap();
        let c2 = store.add_channel(new_channel("two")).await.unwrap();

        let (sink, mut rx) = SnapshotSink::channel();
        let _registration = store.listen_messages(&c1, OrderBy::MESSAGES, sink).unwrap();
        assert!(next(&mut rx).await.is_empty());

        store.add_message(new_message(&c2, "elsewhere", Utc::now())).await.unwrap();
        store.add_message(new_message(&c1, "here", Utc::now())).await.unwrap();

        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text.as_deref(), Some("here"));
        assert_eq!(snapshot[0].channel_id, c1);
    }

    #[tokio::test]
    async fn writes_to_missing_channel_are_not_found() {
        let store = store();
        let err = store
            .add_message(new_message("ghost", "hi", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));

        let summary = ChannelSummary {
            last_message_text: "hi".into(),
            last_message_timestamp: Utc::now(),
        };
        let err = store.merge_channel_summary("ghost", summary).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));

        assert!(store.get_channel("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropping_registration_stops_delivery() {
        let store = store();
        let (sink, mut rx) = SnapshotSink::channel();
        let registration = store.listen_channels(OrderBy::CHANNELS, sink).unwrap();
        next(&mut rx).await;

        drop(registration);
        store.add_channel(new_channel("late")).await.unwrap();

        // The aborted task drops its sink, which closes the receiver.
        let end = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert!(end.is_none());
    }
}
