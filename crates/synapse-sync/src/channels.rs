use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use synapse_store::ChatStore;
use synapse_types::api::{NewChannel, OrderBy};
use synapse_types::error::{ChatError, RemoteError, ValidationError};
use synapse_types::events::ListenerScope;
use synapse_types::models::Channel;

use crate::registry::ListenerRegistry;
use crate::subscription::Subscription;

/// Live channel list plus channel creation and lookup.
#[derive(Clone)]
pub struct ChannelStream {
    store: Arc<dyn ChatStore>,
    registry: ListenerRegistry,
}

impl ChannelStream {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            registry: ListenerRegistry::new(),
        }
    }

    /// Full, ordered channel snapshots; see [`order_channels`].
    pub fn subscribe(&self) -> Subscription<Channel> {
        let store = self.store.clone();
        Subscription::new(
            ListenerScope::Channels,
            self.registry.clone(),
            order_channels,
            Box::new(move |sink| store.listen_channels(OrderBy::CHANNELS, sink)),
        )
    }

    pub async fn create_channel(
        &self,
        name: &str,
        description: Option<&str>,
        creator_id: Option<&str>,
    ) -> Result<String, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyChannelName.into());
        }

        let channel = NewChannel {
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            created_by: creator_id.map(str::to_string),
            created_at: Utc::now(),
        };

        let id = self.store.add_channel(channel).await?;
        info!("created channel '{}' ({})", name, id);
        Ok(id)
    }

    /// `Ok(None)` when no channel has this id.
    pub async fn get_channel_details(&self, id: &str) -> Result<Option<Channel>, RemoteError> {
        self.store.get_channel(id).await
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }
}

/// Most recently active first, idle channels last, ties in delivery order.
/// Repeated ids keep their first occurrence.
pub fn order_channels(channels: Vec<Channel>) -> Vec<Channel> {
    let mut seen = HashSet::new();
    let mut channels: Vec<Channel> = channels
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect();
    channels.sort_by(Channel::activity_order);
    channels
}
