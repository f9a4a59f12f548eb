//! Contracts the sync core consumes (remote chat store, auth service, local
//! key-value storage) and a SQLite-backed implementation of each.

pub mod boundary;
pub mod dispatcher;
pub mod local;

pub use boundary::{
    AuthService, ChatStore, KeyValueStorage, ListenerRegistration, SnapshotResult, SnapshotSink,
};
pub use dispatcher::Dispatcher;
pub use local::{LocalAuthService, LocalChatStore};
