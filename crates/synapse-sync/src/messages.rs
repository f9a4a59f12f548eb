use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use synapse_store::ChatStore;
use synapse_types::DEFAULT_SENDER_NAME;
use synapse_types::api::{NewMessage, OrderBy};
use synapse_types::error::{ChatError, ValidationError};
use synapse_types::events::ListenerScope;
use synapse_types::models::{Message, MessageType};

use crate::registry::ListenerRegistry;
use crate::subscription::Subscription;

/// Per-channel live message feed and the validated send path.
#[derive(Clone)]
pub struct MessageStream {
    store: Arc<dyn ChatStore>,
    registry: ListenerRegistry,
    max_len: usize,
}

impl MessageStream {
    pub fn new(store: Arc<dyn ChatStore>, max_len: usize) -> Self {
        Self {
            store,
            registry: ListenerRegistry::new(),
            max_len,
        }
    }

    /// Oldest-first snapshots of one channel's messages.
    pub fn subscribe(&self, channel_id: &str) -> Subscription<Message> {
        let store = self.store.clone();
        let id = channel_id.to_string();
        Subscription::new(
            ListenerScope::Messages(channel_id.to_string()),
            self.registry.clone(),
            order_messages,
            Box::new(move |sink| store.listen_messages(&id, OrderBy::MESSAGES, sink)),
        )
    }

    /// Validate, write the message, then bump the channel summary.
    ///
    /// The message is already stored when the summary update runs, so a
    /// failure there is logged and the send still succeeds.
    pub async fn send(
        &self,
        channel_id: &str,
        text: Option<&str>,
        image_url: Option<&str>,
        sender_id: &str,
        sender_name: Option<&str>,
    ) -> Result<String, ChatError> {
        let message = validate(channel_id, text, image_url, sender_id, sender_name, self.max_len)?;
        let summary = message.summary();
        let channel_id = message.channel_id.clone();

        let id = self.store.add_message(message).await?;
        debug!("message {} stored in {}", id, channel_id);

        if let Err(e) = self.store.merge_channel_summary(&channel_id, summary).await {
            warn!("message {} sent but summary of {} not updated: {}", id, channel_id, e);
        }

        Ok(id)
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }
}

/// Build the record to store, or say what is wrong with the input.
pub fn validate(
    channel_id: &str,
    text: Option<&str>,
    image_url: Option<&str>,
    sender_id: &str,
    sender_name: Option<&str>,
    max_len: usize,
) -> Result<NewMessage, ValidationError> {
    if channel_id.trim().is_empty() {
        return Err(ValidationError::BlankChannelId);
    }

    let text = text.filter(|t| !t.trim().is_empty());
    let image_url = image_url.map(str::trim).filter(|u| !u.is_empty());
    let kind = match (text, image_url) {
        (None, None) => return Err(ValidationError::EmptyMessage),
        (Some(_), Some(_)) => return Err(ValidationError::ConflictingContent),
        (Some(_), None) => MessageType::Text,
        (None, Some(_)) => MessageType::Image,
    };

    if sender_id.trim().is_empty() {
        return Err(ValidationError::InvalidSender);
    }

    if let Some(text) = text {
        let len = text.chars().count();
        if len > max_len {
            return Err(ValidationError::MessageTooLong { len, max: max_len });
        }
    }

    let sender_name = sender_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_SENDER_NAME);

    Ok(NewMessage {
        channel_id: channel_id.trim().to_string(),
        sender_id: sender_id.to_string(),
        sender_name: sender_name.to_string(),
        text: text.map(str::to_string),
        image_url: image_url.map(str::to_string),
        timestamp: Utc::now(),
        kind,
    })
}

/// Ascending by timestamp, equal timestamps in delivery order, one entry per id.
pub fn order_messages(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut messages: Vec<Message> = messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect();
    messages.sort_by_key(|m| m.timestamp);
    messages
}
