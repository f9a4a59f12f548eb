use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use synapse_types::models::Channel;

use crate::channels::ChannelStream;
use crate::error::SyncError;
use crate::event::EventQueue;
use crate::identity::IdentityManager;
use crate::session_store::SessionStore;
use crate::state::{ChannelListState, ViewState};

use super::TaskSlot;

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelListEvent {
    NavigateToChat(Channel),
    NavigateToVerification,
    /// Short user-facing message, e.g. a rejected channel name.
    Notice(String),
}

/// Drives the channel list screen.
pub struct ChannelListController {
    channels: ChannelStream,
    identity: IdentityManager,
    sessions: SessionStore,
    state: Arc<watch::Sender<ChannelListState>>,
    events: EventQueue<ChannelListEvent>,
    task: TaskSlot,
}

impl ChannelListController {
    pub fn new(channels: ChannelStream, identity: IdentityManager, sessions: SessionStore) -> Self {
        let (state, _) = watch::channel(ChannelListState::Loading);
        Self {
            channels,
            identity,
            sessions,
            state: Arc::new(state),
            events: EventQueue::new(),
            task: TaskSlot::default(),
        }
    }

    pub fn state(&self) -> watch::Receiver<ChannelListState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> ChannelListState {
        self.state.borrow().clone()
    }

    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ChannelListEvent>> {
        self.events.take_receiver()
    }

    /// Check the identity, then follow the channel list. Without an
    /// identity the session is cleared and the user sent back to verify.
    pub async fn start(&self) -> bool {
        let identity = self.identity.current_identity();
        if identity.as_ref().is_none_or(|i| i.uid.trim().is_empty()) {
            warn!("no identity for channel list, back to verification");
            if let Err(e) = self.sessions.clear().await {
                error!("failed to clear session: {}", e);
            }
            self.task.stop();
            self.events.publish(ChannelListEvent::NavigateToVerification);
            return false;
        }

        self.subscribe();
        true
    }

    pub async fn refresh(&self) -> bool {
        self.start().await
    }

    fn subscribe(&self) {
        self.state.send_replace(ViewState::Loading);

        let mut subscription = self.channels.subscribe();
        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                state.send_replace(ViewState::from_snapshot(snapshot));
            }
            debug!("channel list feed ended");
        });
        self.task.replace(handle);
    }

    /// Create a channel owned by the current identity. The new channel
    /// shows up through the live list, not through this call.
    pub async fn create_channel(&self, name: &str, description: Option<&str>) -> Option<String> {
        if name.trim().is_empty() {
            self.events
                .publish(ChannelListEvent::Notice("Channel name cannot be empty.".into()));
            return None;
        }

        let creator = self.identity.current_identity().map(|i| i.uid);
        match self
            .channels
            .create_channel(name, description, creator.as_deref())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!("failed to create channel '{}': {}", name.trim(), e);
                self.state.send_replace(ViewState::error(e));
                None
            }
        }
    }

    pub fn select_channel(&self, channel: Channel) {
        self.events.publish(ChannelListEvent::NavigateToChat(channel));
    }

    /// Sign out and return to verification. Stops following the list
    /// only once the sign-out went through.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        if let Err(e) = self.identity.sign_out().await {
            self.events.publish(ChannelListEvent::Notice(e.to_string()));
            return Err(e.into());
        }
        self.task.stop();
        self.sessions.clear().await?;
        info!("signed out from channel list");
        self.events.publish(ChannelListEvent::NavigateToVerification);
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.task.is_running()
    }
}
