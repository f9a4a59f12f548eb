use std::sync::Arc;

use synapse_store::{AuthService, ChatStore, KeyValueStorage};

use crate::channels::ChannelStream;
use crate::config::SyncConfig;
use crate::controller::{ChannelListController, ChatController, SessionController};
use crate::identity::IdentityManager;
use crate::messages::MessageStream;
use crate::session_store::SessionStore;

/// Wires the core components to a backend. Cheap to clone; every clone
/// shares the same listeners and session slot.
#[derive(Clone)]
pub struct SyncClient {
    config: SyncConfig,
    sessions: SessionStore,
    identity: IdentityManager,
    channels: ChannelStream,
    messages: MessageStream,
}

impl SyncClient {
    pub async fn new(
        store: Arc<dyn ChatStore>,
        auth: Arc<dyn AuthService>,
        storage: Arc<dyn KeyValueStorage>,
        config: SyncConfig,
    ) -> Self {
        Self {
            sessions: SessionStore::open(storage).await,
            identity: IdentityManager::new(auth, config.access_code.clone()),
            channels: ChannelStream::new(store.clone()),
            messages: MessageStream::new(store, config.max_message_length),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn identity(&self) -> &IdentityManager {
        &self.identity
    }

    pub fn channels(&self) -> &ChannelStream {
        &self.channels
    }

    pub fn messages(&self) -> &MessageStream {
        &self.messages
    }

    pub fn session_controller(&self) -> SessionController {
        SessionController::new(self.identity.clone(), self.sessions.clone())
    }

    pub fn channel_list_controller(&self) -> ChannelListController {
        ChannelListController::new(
            self.channels.clone(),
            self.identity.clone(),
            self.sessions.clone(),
        )
    }

    pub fn chat_controller(&self) -> ChatController {
        ChatController::new(
            self.messages.clone(),
            self.sessions.clone(),
            self.config.display_name.clone(),
        )
    }
}
