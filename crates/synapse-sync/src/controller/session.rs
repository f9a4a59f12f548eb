use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::error::SyncError;
use crate::event::EventQueue;
use crate::identity::IdentityManager;
use crate::session_store::SessionStore;
use crate::state::{SessionAction, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    NavigateToMain(String),
}

/// Drives the verification screen and auto-login.
pub struct SessionController {
    identity: IdentityManager,
    sessions: SessionStore,
    state: watch::Sender<SessionState>,
    events: EventQueue<SessionEvent>,
}

impl SessionController {
    pub fn new(identity: IdentityManager, sessions: SessionStore) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            identity,
            sessions,
            state,
            events: EventQueue::new(),
        }
    }

    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take_receiver()
    }

    /// Resume a persisted session. A session whose identity is gone is
    /// stale and gets cleared so the user verifies again.
    pub async fn restore(&self) -> bool {
        let Some(session) = self.sessions.get().await else {
            return false;
        };

        if self.identity.current_identity().is_none() {
            warn!("persisted session {} has no identity, clearing", session.session_id);
            if let Err(e) = self.sessions.clear().await {
                error!("failed to clear stale session: {}", e);
            }
            return false;
        }

        info!("restored session {}", session.session_id);
        self.authenticated(session.session_id);
        true
    }

    pub async fn verify_code(&self, code: &str) {
        if matches!(*self.state.borrow(), SessionState::Authenticated { .. }) {
            return;
        }
        self.apply(SessionAction::VerifyStarted);

        let session_id = match self.identity.verify_access_code(code).await {
            Ok(session_id) => session_id,
            Err(e) => {
                self.apply(SessionAction::Failed(e.into()));
                return;
            }
        };

        match self.sessions.save_session_id(&session_id).await {
            Ok(session) => self.authenticated(session.session_id),
            Err(e) => {
                error!("verified but could not persist session: {}", e);
                self.apply(SessionAction::Failed(e.into()));
            }
        }
    }

    /// Revoke the identity, then forget the session. On failure nothing
    /// changes and the user stays signed in.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        self.identity.sign_out().await?;
        self.sessions.clear().await?;
        self.apply(SessionAction::SignedOut);
        info!("signed out");
        Ok(())
    }

    fn authenticated(&self, session_id: String) {
        self.apply(SessionAction::Verified(session_id.clone()));
        self.events.publish(SessionEvent::NavigateToMain(session_id));
    }

    fn apply(&self, action: SessionAction) {
        self.state
            .send_modify(|state| *state = std::mem::take(state).reduce(action));
    }
}
