use std::sync::Arc;

use tracing::{info, warn};

use synapse_store::AuthService;
use synapse_types::error::AuthError;
use synapse_types::models::Identity;

/// Admission and anonymous identity.
///
/// The access code is one secret shared by every client of a deployment,
/// not a per-user credential. Holding it is the only admission check.
#[derive(Clone)]
pub struct IdentityManager {
    auth: Arc<dyn AuthService>,
    access_code: String,
}

impl IdentityManager {
    pub fn new(auth: Arc<dyn AuthService>, access_code: impl Into<String>) -> Self {
        Self {
            auth,
            access_code: access_code.into(),
        }
    }

    /// Cached identity from the auth service; may be stale.
    pub fn current_identity(&self) -> Option<Identity> {
        self.auth.current_user()
    }

    /// Returns the existing identity, or signs in anonymously if there is none.
    pub async fn establish_anonymous_identity(&self) -> Result<Identity, AuthError> {
        if let Some(identity) = self.auth.current_user() {
            return Ok(identity);
        }

        let identity = self.auth.sign_in_anonymously().await?;
        if identity.uid.trim().is_empty() {
            return Err(AuthError::NoIdentity);
        }
        info!("anonymous identity {} established", identity.uid);
        Ok(identity)
    }

    /// Check `code` and return the session id (the identity key) on a match.
    pub async fn verify_access_code(&self, code: &str) -> Result<String, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::EmptyCode);
        }
        if code != self.access_code {
            warn!("rejected verification attempt");
            return Err(AuthError::InvalidCode);
        }

        let identity = self.establish_anonymous_identity().await?;
        Ok(identity.uid)
    }

    /// Revoke the remote binding. The caller clears the session store
    /// afterwards, and only if this succeeded.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await?;
        Ok(())
    }
}
