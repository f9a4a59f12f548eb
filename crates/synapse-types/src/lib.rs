pub mod api;
pub mod error;
pub mod events;
pub mod models;

/// Local preference key holding the persisted session.
pub const KEY_SESSION_ID: &str = "session_id";

/// Upper bound on message text, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Sender name used when the caller supplies none.
pub const DEFAULT_SENDER_NAME: &str = "Anonymous";

pub const DEFAULT_ANONYMOUS_DISPLAY_NAME: &str = "Anonymous User";

/// Channel summary text written for image messages.
pub const IMAGE_SUMMARY_TEXT: &str = "Image";

/// Shared admission code accepted when none is configured.
pub const DEFAULT_ACCESS_CODE: &str = "123456";
