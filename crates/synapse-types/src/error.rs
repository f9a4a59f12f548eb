use thiserror::Error;

/// Caller-fixable input problems, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Channel name cannot be empty.")]
    EmptyChannelName,
    #[error("Channel ID cannot be blank.")]
    BlankChannelId,
    #[error("Message must have text or an image URL.")]
    EmptyMessage,
    #[error("Message cannot carry both text and an image URL.")]
    ConflictingContent,
    #[error("Sender ID cannot be blank.")]
    InvalidSender,
    #[error("Message is too long ({len} characters, max {max}).")]
    MessageTooLong { len: usize, max: usize },
}

/// A remote store or auth call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote service unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("listener failed: {0}")]
    Listener(String),
    #[error("remote backend error: {0}")]
    Backend(String),
}

/// Local durable storage failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("failed to read local storage: {0}")]
    Read(String),
    #[error("failed to write local storage: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Verification code cannot be empty.")]
    EmptyCode,
    #[error("Invalid verification code provided.")]
    InvalidCode,
    #[error("Failed to establish anonymous session or get UID.")]
    NoIdentity,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Failure of a validated write (channel creation, message send).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ChatError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
