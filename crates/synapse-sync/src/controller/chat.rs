use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use crate::error::SyncError;
use crate::event::EventQueue;
use crate::messages::MessageStream;
use crate::session_store::SessionStore;
use crate::state::{ChatState, ViewState};

use super::TaskSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEvent {
    /// Outcome of one `send_message` call.
    MessageSent(bool),
}

#[derive(Default)]
struct Target {
    channel_id: Option<String>,
    user_id: Option<String>,
}

/// Drives one chat screen: the open channel's messages and the composer.
pub struct ChatController {
    messages: MessageStream,
    sessions: SessionStore,
    display_name: String,
    state: Arc<watch::Sender<ChatState>>,
    events: EventQueue<ChatEvent>,
    target: Mutex<Target>,
    task: TaskSlot,
}

impl ChatController {
    pub fn new(messages: MessageStream, sessions: SessionStore, display_name: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ChatState::Loading);
        Self {
            messages,
            sessions,
            display_name: display_name.into(),
            state: Arc::new(state),
            events: EventQueue::new(),
            target: Mutex::new(Target::default()),
            task: TaskSlot::default(),
        }
    }

    pub fn state(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ChatEvent>> {
        self.events.take_receiver()
    }

    /// Session id of the local user, known once messages were loaded.
    pub fn current_user_id(&self) -> Option<String> {
        self.target().user_id.clone()
    }

    pub fn current_channel_id(&self) -> Option<String> {
        self.target().channel_id.clone()
    }

    /// Follow `channel_id` as the user of the current session. Asking again
    /// for the channel already shown to the same user is a no-op.
    pub async fn load_messages(&self, channel_id: &str) {
        let Some(session) = self.sessions.get().await else {
            warn!("no session, cannot load messages for {}", channel_id);
            self.task.stop();
            {
                let mut target = self.target();
                target.channel_id = Some(channel_id.to_string());
                target.user_id = None;
            }
            self.state.send_replace(ViewState::error(SyncError::MissingSession));
            return;
        };

        let already_shown = {
            let target = self.target();
            target.channel_id.as_deref() == Some(channel_id)
                && target.user_id.as_deref() == Some(session.session_id.as_str())
        } && self.state.borrow().is_success();
        if already_shown {
            debug!("messages for {} already loaded", channel_id);
            return;
        }

        {
            let mut target = self.target();
            target.channel_id = Some(channel_id.to_string());
            target.user_id = Some(session.session_id);
        }
        self.state.send_replace(ViewState::Loading);

        let mut subscription = self.messages.subscribe(channel_id);
        let state = self.state.clone();
        let channel = channel_id.to_string();
        let handle = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                state.send_replace(ViewState::from_snapshot(snapshot));
            }
            debug!("message feed for {} ended", channel);
        });
        self.task.replace(handle);
    }

    /// Send a text message to the open channel. Returns whether it was stored.
    pub async fn send_message(&self, text: &str) -> bool {
        let (channel_id, sender_id) = {
            let target = self.target();
            (target.channel_id.clone(), target.user_id.clone())
        };
        let (Some(channel_id), Some(sender_id)) = (channel_id, sender_id) else {
            warn!("send with no open channel or session");
            self.events.publish(ChatEvent::MessageSent(false));
            return false;
        };

        if text.trim().is_empty() {
            self.events.publish(ChatEvent::MessageSent(false));
            return false;
        }

        let sent = self
            .messages
            .send(&channel_id, Some(text), None, &sender_id, Some(&self.display_name))
            .await;
        match sent {
            Ok(_) => {
                self.events.publish(ChatEvent::MessageSent(true));
                true
            }
            Err(e) => {
                error!("failed to send message to {}: {}", channel_id, e);
                self.events.publish(ChatEvent::MessageSent(false));
                self.state.send_replace(ViewState::error(e));
                false
            }
        }
    }

    /// Stop following the open channel and forget whose session it was.
    pub fn close(&self) {
        self.task.stop();
        *self.target() = Target::default();
    }

    fn target(&self) -> std::sync::MutexGuard<'_, Target> {
        self.target.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
