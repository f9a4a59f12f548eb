use std::collections::HashSet;

use chrono::Local;
use tokio::sync::watch;

use synapse_sync::{ChannelListState, ChatState, SessionState, ViewState};
use synapse_types::models::{Channel, Message, MessageType};

pub fn channel_line(position: usize, channel: &Channel) -> String {
    match &channel.last_message_text {
        Some(last) => format!("{:>3}. #{}  ({})", position, channel.name, last),
        None => format!("{:>3}. #{}", position, channel.name),
    }
}

pub fn message_line(message: &Message, own_id: Option<&str>) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let who = if own_id == Some(message.sender_id.as_str()) {
        "you"
    } else {
        message.sender_name.as_str()
    };
    let body = match message.kind {
        MessageType::Text => message.text.as_deref().unwrap_or_default(),
        MessageType::Image => message.image_url.as_deref().unwrap_or_default(),
    };
    format!("[{}] {}: {}", time, who, body)
}

pub async fn session(mut rx: watch::Receiver<SessionState>) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        match state {
            SessionState::Verifying => println!("verifying..."),
            SessionState::VerificationFailed { message, .. } => println!("! {}", message),
            SessionState::Authenticated { .. } | SessionState::Idle => {}
        }
    }
}

pub async fn channel_list(mut rx: watch::Receiver<ChannelListState>) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        match state {
            ViewState::Loading => println!("loading channels..."),
            ViewState::Empty => println!("no channels yet, try /create <name>"),
            ViewState::Success(channels) => {
                println!("channels:");
                for (i, channel) in channels.iter().enumerate() {
                    println!("{}", channel_line(i + 1, channel));
                }
            }
            ViewState::Error { message, .. } => println!("! {}", message),
        }
    }
}

/// Prints each message once. `own_id` marks the local user's lines.
pub async fn chat(mut rx: watch::Receiver<ChatState>, own_id: watch::Receiver<Option<String>>) {
    let mut shown = HashSet::new();
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        match state {
            ViewState::Loading => shown.clear(),
            ViewState::Empty => println!("no messages yet"),
            ViewState::Success(messages) => {
                let own = own_id.borrow().clone();
                for message in messages.iter().filter(|m| shown.insert(m.id.clone())) {
                    println!("{}", message_line(message, own.as_deref()));
                }
            }
            ViewState::Error { message, .. } => println!("! {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(kind: MessageType) -> Message {
        Message {
            id: "m1".into(),
            channel_id: "c1".into(),
            sender_id: "u1".into(),
            sender_name: "Kit".into(),
            text: (kind == MessageType::Text).then(|| "hi all".into()),
            image_url: (kind == MessageType::Image).then(|| "https://img/1.png".into()),
            timestamp: Utc.timestamp_millis_opt(0).unwrap(),
            kind,
        }
    }

    #[test]
    fn message_lines() {
        let text = message_line(&message(MessageType::Text), None);
        assert!(text.ends_with("] Kit: hi all"), "{text}");

        let own = message_line(&message(MessageType::Text), Some("u1"));
        assert!(own.ends_with("] you: hi all"), "{own}");

        let image = message_line(&message(MessageType::Image), None);
        assert!(image.ends_with("Kit: https://img/1.png"), "{image}");
    }

    #[test]
    fn channel_lines() {
        let mut channel = Channel {
            id: "c1".into(),
            name: "general".into(),
            description: None,
            created_by: None,
            created_at: Utc.timestamp_millis_opt(0).unwrap(),
            last_message_text: None,
            last_message_timestamp: None,
        };
        assert_eq!(channel_line(1, &channel), "  1. #general");

        channel.last_message_text = Some("hello".into());
        assert_eq!(channel_line(12, &channel), " 12. #general  (hello)");
    }
}
