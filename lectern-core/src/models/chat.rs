use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{generate_id, UserId};
use super::user::UserRef;

/// One chat message in a room's append-only chat feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: UserId,
    pub nickname: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: &UserRef, content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            user_id: sender.id.clone(),
            nickname: sender.name.clone(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_carries_sender_identity() {
        let sender = UserRef::listener(UserId::from("u1"), "Alice");
        let msg = ChatMessage::new(&sender, "hello");
        assert_eq!(msg.user_id, UserId::from("u1"));
        assert_eq!(msg.nickname, "Alice");
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.id.len(), 12);
    }
}
