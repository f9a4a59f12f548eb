use serde::{Deserialize, Serialize};

/// Change notifications fanned out by a store to its live listeners.
/// Listeners react by re-reading a full snapshot, never by applying a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    /// A channel was created or its summary fields changed.
    ChannelsChanged,

    /// A message was appended to a channel.
    MessagesChanged { channel_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum ListenerScope {
    Channels,
    Messages(String),
}

impl StoreEvent {
    /// Whether a listener registered for `scope` must refresh on this event.
    pub fn affects(&self, scope: &ListenerScope) -> bool {
        match (self, scope) {
            (Self::ChannelsChanged, ListenerScope::Channels) => true,
            (Self::MessagesChanged { channel_id }, ListenerScope::Messages(id)) => channel_id == id,
            _ => false,
        }
    }
}
