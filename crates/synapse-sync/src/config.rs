use synapse_types::{DEFAULT_ACCESS_CODE, DEFAULT_SENDER_NAME, MAX_MESSAGE_LENGTH};

/// Tunables for the sync core. The binary fills this from the environment.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Shared admission code. Anyone holding it gets an anonymous identity.
    pub access_code: String,
    pub max_message_length: usize,
    /// Sender name attached to outgoing messages.
    pub display_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            access_code: DEFAULT_ACCESS_CODE.to_string(),
            max_message_length: MAX_MESSAGE_LENGTH,
            display_name: DEFAULT_SENDER_NAME.to_string(),
        }
    }
}
