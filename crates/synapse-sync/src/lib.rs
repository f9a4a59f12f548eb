//! Realtime synchronization and session-state core.
//!
//! Turns push-based store listeners into ordered, deduplicated snapshot
//! streams, manages the anonymous session, and reduces everything into the
//! view states the presentation layer renders.

pub mod channels;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod identity;
pub mod messages;
pub mod registry;
pub mod session_store;
pub mod state;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use channels::ChannelStream;
pub use client::SyncClient;
pub use config::SyncConfig;
pub use controller::{
    ChannelListController, ChannelListEvent, ChatController, ChatEvent, SessionController,
    SessionEvent,
};
pub use error::SyncError;
pub use identity::IdentityManager;
pub use messages::MessageStream;
pub use session_store::SessionStore;
pub use state::{ChannelListState, ChatState, SessionAction, SessionState, ViewState};
pub use subscription::Subscription;
