//! Row types as stored in SQLite, separate from the synapse-types models.
//! Timestamps are Unix milliseconds.

pub struct IdentityRow {
    pub uid: String,
    pub anonymous: bool,
    pub created_at_ms: i64,
}

pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_at_ms: i64,
    pub last_message_text: Option<String>,
    pub last_message_ms: Option<i64>,
}

pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub timestamp_ms: i64,
    pub kind: String,
}
