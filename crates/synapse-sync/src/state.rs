use std::sync::Arc;

use synapse_store::SnapshotResult;
use synapse_types::models::{Channel, Message};

use crate::error::SyncError;

/// What a list screen renders for one subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Success(Vec<T>),
    Empty,
    Error {
        message: String,
        cause: Option<Arc<SyncError>>,
    },
}

pub type ChannelListState = ViewState<Channel>;
pub type ChatState = ViewState<Message>;

impl<T> ViewState<T> {
    pub fn error(err: impl Into<SyncError>) -> Self {
        let err = err.into();
        Self::Error {
            message: err.to_string(),
            cause: Some(Arc::new(err)),
        }
    }

    /// State for one snapshot. Independent of the previous state, so an
    /// error is replaced by the next good snapshot.
    pub fn from_snapshot(snapshot: SnapshotResult<T>) -> Self {
        match snapshot {
            Ok(items) if items.is_empty() => Self::Empty,
            Ok(items) => Self::Success(items),
            Err(e) => Self::error(e),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn items(&self) -> &[T] {
        match self {
            Self::Success(items) => items,
            _ => &[],
        }
    }
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self::Loading
    }
}

/// Verification screen state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Verifying,
    Authenticated { session_id: String },
    VerificationFailed {
        message: String,
        cause: Option<Arc<SyncError>>,
    },
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    VerifyStarted,
    Verified(String),
    Failed(SyncError),
    SignedOut,
}

impl SessionState {
    /// Once authenticated, only a sign-out leaves that state.
    pub fn reduce(self, action: SessionAction) -> Self {
        match (self, action) {
            (_, SessionAction::SignedOut) => Self::Idle,
            (current @ Self::Authenticated { .. }, _) => current,
            (_, SessionAction::VerifyStarted) => Self::Verifying,
            (_, SessionAction::Verified(session_id)) => Self::Authenticated { session_id },
            (_, SessionAction::Failed(err)) => Self::VerificationFailed {
                message: err.to_string(),
                cause: Some(Arc::new(err)),
            },
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Authenticated { session_id } => Some(session_id),
            _ => None,
        }
    }
}
