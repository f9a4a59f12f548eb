use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use synapse_store::KeyValueStorage;
use synapse_types::KEY_SESSION_ID;
use synapse_types::error::StorageError;
use synapse_types::models::Session;

/// Single-slot persisted session. All clones share one slot and one set of
/// observers; writes go through one at a time.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    current: Arc<watch::Sender<Option<Session>>>,
    write_lock: Arc<Mutex<()>>,
}

impl SessionStore {
    /// Load the persisted session (if any) and start tracking it.
    pub async fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let initial = read_session(storage.clone()).await;
        if let Some(session) = &initial {
            info!("found persisted session {}", session.session_id);
        }
        let (current, _) = watch::channel(initial);
        Self {
            storage,
            current: Arc::new(current),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Point read from storage. Unreadable storage counts as no session.
    ///
    /// Holds the write lock so a read that started before a save cannot
    /// publish its older value after the save.
    pub async fn get(&self) -> Option<Session> {
        let _guard = self.write_lock.lock().await;

        let session = match load_session(self.storage.clone()).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Error reading session from preferences: {}", e);
                return None;
            }
        };

        // Storage changed underneath us: let observers know.
        self.current.send_if_modified(|current| {
            if *current != session {
                *current = session.clone();
                true
            } else {
                false
            }
        });

        session
    }

    /// Current value first, then every change. Each call starts a fresh sequence.
    pub fn observe(&self) -> WatchStream<Option<Session>> {
        WatchStream::new(self.current.subscribe())
    }

    /// Persist `session`, replacing any previous one.
    pub async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let encoded =
            serde_json::to_string(session).map_err(|e| StorageError::Write(e.to_string()))?;
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.set(KEY_SESSION_ID, &encoded))
            .await
            .map_err(|e| StorageError::Write(format!("spawn_blocking join error: {}", e)))??;

        debug!("session {} saved", session.session_id);
        self.current.send_replace(Some(session.clone()));
        Ok(())
    }

    /// Persist a session for `session_id` obtained now.
    pub async fn save_session_id(&self, session_id: &str) -> Result<Session, StorageError> {
        let session = Session::new(session_id);
        self.save(&session).await?;
        Ok(session)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.delete(KEY_SESSION_ID))
            .await
            .map_err(|e| StorageError::Write(format!("spawn_blocking join error: {}", e)))??;

        debug!("session cleared");
        self.current.send_replace(None);
        Ok(())
    }
}

async fn read_session(storage: Arc<dyn KeyValueStorage>) -> Option<Session> {
    match load_session(storage).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Error reading session from preferences: {}", e);
            None
        }
    }
}

/// Undecodable values count as absent; only storage failures are errors.
async fn load_session(storage: Arc<dyn KeyValueStorage>) -> Result<Option<Session>, StorageError> {
    let raw = tokio::task::spawn_blocking(move || storage.get(KEY_SESSION_ID))
        .await
        .map_err(|e| StorageError::Read(format!("spawn_blocking join error: {}", e)))??;
    let Some(raw) = raw else { return Ok(None) };

    match serde_json::from_str(&raw) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            warn!("Ignoring undecodable persisted session: {}", e);
            Ok(None)
        }
    }
}
