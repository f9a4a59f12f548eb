//! SQLite-backed implementations of the store boundaries.

mod auth;
mod chat;
mod preferences;

pub use auth::LocalAuthService;
pub use chat::LocalChatStore;

use std::sync::Arc;

use synapse_db::Database;
use synapse_types::error::RemoteError;

/// Run a blocking DB call off the async runtime.
async fn blocking<T, F>(db: &Arc<Database>, f: F) -> Result<T, RemoteError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| RemoteError::Backend(format!("spawn_blocking join error: {}", e)))?
        .map_err(|e| RemoteError::Backend(e.to_string()))
}
