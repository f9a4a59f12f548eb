use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use synapse_db::Database;
use synapse_db::models::IdentityRow;
use synapse_types::error::RemoteError;
use synapse_types::models::Identity;

use super::blocking;
use crate::boundary::AuthService;

/// Preference key remembering which identity is signed in across restarts.
const KEY_CURRENT_UID: &str = "auth_current_uid";

/// Anonymous auth over the local database. The signed-in identity survives a
/// restart, so a reopened service reports the same `current_user`.
pub struct LocalAuthService {
    db: Arc<Database>,
    current: RwLock<Option<Identity>>,
    /// Serializes sign-in and sign-out so a check-then-create runs alone.
    switching: Mutex<()>,
}

impl LocalAuthService {
    pub fn open(db: Arc<Database>) -> anyhow::Result<Self> {
        let current = match db.get_preference(KEY_CURRENT_UID)? {
            Some(uid) => match db.get_identity(&uid)? {
                Some(row) => Some(identity_from_row(row)),
                None => {
                    warn!("signed-in identity {} no longer exists", uid);
                    db.delete_preference(KEY_CURRENT_UID)?;
                    None
                }
            },
            None => None,
        };

        if let Some(identity) = &current {
            info!("restored anonymous identity {}", identity.uid);
        }

        Ok(Self {
            db,
            current: RwLock::new(current),
            switching: Mutex::new(()),
        })
    }

    fn set_current(&self, identity: Option<Identity>) {
        match self.current.write() {
            Ok(mut current) => *current = identity,
            Err(e) => warn!("identity lock poisoned: {}", e),
        }
    }
}

#[async_trait]
impl AuthService for LocalAuthService {
    fn current_user(&self) -> Option<Identity> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    async fn sign_in_anonymously(&self) -> Result<Identity, RemoteError> {
        let _switching = self.switching.lock().await;
        if let Some(identity) = self.current_user() {
            return Ok(identity);
        }

        let identity = Identity {
            uid: Uuid::new_v4().simple().to_string(),
            anonymous: true,
            created_at: Utc::now(),
        };
        let row = IdentityRow {
            uid: identity.uid.clone(),
            anonymous: identity.anonymous,
            created_at_ms: identity.created_at.timestamp_millis(),
        };

        blocking(&self.db, move |db| {
            db.insert_identity(&row)?;
            db.set_preference(KEY_CURRENT_UID, &row.uid)
        })
        .await?;

        info!("signed in anonymously as {}", identity.uid);
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        let _switching = self.switching.lock().await;
        blocking(&self.db, |db| db.delete_preference(KEY_CURRENT_UID)).await?;
        if let Some(identity) = self.current_user() {
            info!("signed out {}", identity.uid);
        }
        self.set_current(None);
        Ok(())
    }
}

fn identity_from_row(row: IdentityRow) -> Identity {
    Identity {
        created_at: DateTime::from_timestamp_millis(row.created_at_ms).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on identity '{}'", row.created_at_ms, row.uid);
            DateTime::default()
        }),
        uid: row.uid,
        anonymous: row.anonymous,
    }
}
