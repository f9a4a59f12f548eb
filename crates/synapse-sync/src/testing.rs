//! In-memory fakes of the store boundaries, with call counters and fault switches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use synapse_store::{
    AuthService, ChatStore, KeyValueStorage, ListenerRegistration, SnapshotSink,
};
use synapse_types::api::{ChannelSummary, NewChannel, NewMessage, OrderBy};
use synapse_types::error::{RemoteError, StorageError};
use synapse_types::models::{Channel, Identity, Message, MessageType};

pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

pub fn channel(id: &str, last_ms: Option<i64>) -> Channel {
    Channel {
        id: id.to_string(),
        name: format!("#{id}"),
        description: None,
        created_by: None,
        created_at: at(0),
        last_message_text: last_ms.map(|_| "hi".to_string()),
        last_message_timestamp: last_ms.map(at),
    }
}

pub fn message(id: &str, channel_id: &str, ms: i64) -> Message {
    Message {
        id: id.to_string(),
        channel_id: channel_id.to_string(),
        sender_id: "u1".to_string(),
        sender_name: "Anonymous".to_string(),
        text: Some(format!("text of {id}")),
        image_url: None,
        timestamp: at(ms),
        kind: MessageType::Text,
    }
}

// -- Chat store --

#[derive(Default)]
struct StoreState {
    channels: Vec<Channel>,
    messages: Vec<Message>,
    channel_sinks: HashMap<u64, SnapshotSink<Channel>>,
    message_sinks: HashMap<u64, (String, SnapshotSink<Message>)>,
    next_id: u64,
    listen_calls: usize,
    unsubscribe_calls: usize,
    write_calls: usize,
    summaries: Vec<(String, ChannelSummary)>,
    fail_listen: bool,
    fail_writes: bool,
    fail_summary: bool,
}

impl StoreState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn publish_channels(&self) {
        for sink in self.channel_sinks.values() {
            sink.deliver(Ok(self.channels.clone()));
        }
    }

    fn publish_messages(&self, channel_id: &str) {
        let snapshot: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect();
        for (cid, sink) in self.message_sinks.values() {
            if cid == channel_id {
                sink.deliver(Ok(snapshot.clone()));
            }
        }
    }
}

/// Snapshots are pushed synchronously from the calling task, in call order.
#[derive(Default)]
pub struct FakeChatStore {
    state: Arc<Mutex<StoreState>>,
}

impl FakeChatStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    /// Replace the channel collection and push it to every channel listener.
    pub fn push_channels(&self, channels: Vec<Channel>) {
        let mut state = self.state();
        state.channels = channels;
        state.publish_channels();
    }

    pub fn push_channel_error(&self, err: RemoteError) {
        let state = self.state();
        for sink in state.channel_sinks.values() {
            sink.deliver(Err(err.clone()));
        }
    }

    /// Replace one channel's messages and push them to its listeners.
    pub fn push_messages(&self, channel_id: &str, messages: Vec<Message>) {
        let mut state = self.state();
        state.messages.retain(|m| m.channel_id != channel_id);
        state.messages.extend(messages);
        state.publish_messages(channel_id);
    }

    pub fn push_message_error(&self, channel_id: &str, err: RemoteError) {
        let state = self.state();
        for (cid, sink) in state.message_sinks.values() {
            if cid == channel_id {
                sink.deliver(Err(err.clone()));
            }
        }
    }

    pub fn listen_calls(&self) -> usize {
        self.state().listen_calls
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.state().unsubscribe_calls
    }

    pub fn live_listeners(&self) -> usize {
        let state = self.state();
        state.channel_sinks.len() + state.message_sinks.len()
    }

    pub fn write_calls(&self) -> usize {
        self.state().write_calls
    }

    pub fn summaries(&self) -> Vec<(String, ChannelSummary)> {
        self.state().summaries.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn fail_listen(&self, fail: bool) {
        self.state().fail_listen = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn fail_summary(&self, fail: bool) {
        self.state().fail_summary = fail;
    }
}

enum SinkKey {
    Channels(u64),
    Messages(u64),
}

struct FakeRegistration {
    key: SinkKey,
    state: Arc<Mutex<StoreState>>,
}

impl ListenerRegistration for FakeRegistration {
    fn remove(self: Box<Self>) {
        let mut state = self.state.lock().unwrap();
        state.unsubscribe_calls += 1;
        match self.key {
            SinkKey::Channels(id) => {
                state.channel_sinks.remove(&id);
            }
            SinkKey::Messages(id) => {
                state.message_sinks.remove(&id);
            }
        }
    }
}

#[async_trait]
impl ChatStore for FakeChatStore {
    fn listen_channels(
        &self,
        _order: OrderBy,
        sink: SnapshotSink<Channel>,
    ) -> Result<Box<dyn ListenerRegistration>, RemoteError> {
        let mut state = self.state();
        if state.fail_listen {
            return Err(RemoteError::Unavailable("listen refused".into()));
        }
        state.listen_calls += 1;
        let id = state.next_id();
        sink.deliver(Ok(state.channels.clone()));
        state.channel_sinks.insert(id, sink);
        Ok(Box::new(FakeRegistration {
            key: SinkKey::Channels(id),
            state: self.state.clone(),
        }))
    }

    fn listen_messages(
        &self,
        channel_id: &str,
        _order: OrderBy,
        sink: SnapshotSink<Message>,
    ) -> Result<Box<dyn ListenerRegistration>, RemoteError> {
        let mut state = self.state();
        if state.fail_listen {
            return Err(RemoteError::Unavailable("listen refused".into()));
        }
        state.listen_calls += 1;
        let id = state.next_id();
        let snapshot: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect();
        sink.deliver(Ok(snapshot));
        state.message_sinks.insert(id, (channel_id.to_string(), sink));
        Ok(Box::new(FakeRegistration {
            key: SinkKey::Messages(id),
            state: self.state.clone(),
        }))
    }

    async fn add_channel(&self, channel: NewChannel) -> Result<String, RemoteError> {
        let mut state = self.state();
        state.write_calls += 1;
        if state.fail_writes {
            return Err(RemoteError::Unavailable("offline".into()));
        }
        let id = format!("ch-{}", state.next_id());
        state.channels.push(Channel {
            id: id.clone(),
            name: channel.name,
            description: channel.description,
            created_by: channel.created_by,
            created_at: channel.created_at,
            last_message_text: None,
            last_message_timestamp: None,
        });
        state.publish_channels();
        Ok(id)
    }

    async fn get_channel(&self, id: &str) -> Result<Option<Channel>, RemoteError> {
        Ok(self.state().channels.iter().find(|c| c.id == id).cloned())
    }

    async fn add_message(&self, message: NewMessage) -> Result<String, RemoteError> {
        let mut state = self.state();
        state.write_calls += 1;
        if state.fail_writes {
            return Err(RemoteError::Unavailable("offline".into()));
        }
        let id = format!("msg-{}", state.next_id());
        let channel_id = message.channel_id.clone();
        state.messages.push(Message {
            id: id.clone(),
            channel_id: message.channel_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            text: message.text,
            image_url: message.image_url,
            timestamp: message.timestamp,
            kind: message.kind,
        });
        state.publish_messages(&channel_id);
        Ok(id)
    }

    async fn merge_channel_summary(
        &self,
        channel_id: &str,
        summary: ChannelSummary,
    ) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.write_calls += 1;
        if state.fail_summary {
            return Err(RemoteError::Backend("summary rejected".into()));
        }
        state.summaries.push((channel_id.to_string(), summary.clone()));
        if let Some(channel) = state.channels.iter_mut().find(|c| c.id == channel_id) {
            channel.last_message_text = Some(summary.last_message_text);
            channel.last_message_timestamp = Some(summary.last_message_timestamp);
        }
        state.publish_channels();
        Ok(())
    }
}

// -- Auth --

#[derive(Default)]
pub struct FakeAuth {
    current: Mutex<Option<Identity>>,
    sign_in_calls: AtomicUsize,
    fail_sign_in: AtomicBool,
    fail_sign_out: AtomicBool,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn signed_in(uid: &str) -> Arc<Self> {
        let auth = Self::default();
        *auth.current.lock().unwrap() = Some(Identity {
            uid: uid.to_string(),
            anonymous: true,
            created_at: at(0),
        });
        Arc::new(auth)
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn fail_sign_in(&self, fail: bool) {
        self.fail_sign_in.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthService for FakeAuth {
    fn current_user(&self) -> Option<Identity> {
        self.current.lock().unwrap().clone()
    }

    async fn sign_in_anonymously(&self) -> Result<Identity, RemoteError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_in.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("auth offline".into()));
        }
        let mut current = self.current.lock().unwrap();
        let identity = current
            .get_or_insert_with(|| Identity {
                uid: "anon-uid-1".to_string(),
                anonymous: true,
                created_at: Utc::now(),
            })
            .clone();
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("auth offline".into()));
        }
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}

// -- Local storage --

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    read_delay: Mutex<Duration>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every read block for `delay` (reads run on the blocking pool).
    pub fn slow_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Read("disk unreadable".into()));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("disk full".into()));
        }
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("disk full".into()));
        }
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
