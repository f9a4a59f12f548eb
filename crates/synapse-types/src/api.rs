use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MessageType;

// -- Queries --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    LastMessageTimestamp,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Every store query names its sort field and direction explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: SortField,
    pub direction: Direction,
}

impl OrderBy {
    /// Channel list: most recent activity first.
    pub const CHANNELS: OrderBy = OrderBy {
        field: SortField::LastMessageTimestamp,
        direction: Direction::Descending,
    };

    /// Channel messages: oldest first.
    pub const MESSAGES: OrderBy = OrderBy {
        field: SortField::Timestamp,
        direction: Direction::Ascending,
    };
}

// -- Channels --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Merge-update applied to a channel after a message is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub last_message_text: String,
    pub last_message_timestamp: DateTime<Utc>,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub channel_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

impl NewMessage {
    pub fn summary(&self) -> ChannelSummary {
        let last_message_text = match (&self.text, &self.image_url) {
            (Some(text), _) => text.clone(),
            (None, Some(_)) => crate::IMAGE_SUMMARY_TEXT.to_string(),
            (None, None) => String::new(),
        };
        ChannelSummary {
            last_message_text,
            last_message_timestamp: self.timestamp,
        }
    }
}
