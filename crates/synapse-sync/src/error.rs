use thiserror::Error;

use synapse_types::error::{AuthError, ChatError, RemoteError, StorageError, ValidationError};

/// Any failure the core can surface to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("User session not found.")]
    MissingSession,
}

impl From<ChatError> for SyncError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(e) => Self::Validation(e),
            ChatError::Remote(e) => Self::Remote(e),
        }
    }
}
