//! Chat service
//!
//! Append-only room chat. Delivery follows the store's snapshot semantics:
//! subscribers read the full message list, newest state wins.

use std::sync::Arc;

use crate::models::{ChatMessage, RoomId, UserRef};
use crate::store::{ChatStore, ChatSubscription};
use crate::validation;
use crate::Result;

#[derive(Clone)]
pub struct ChatService {
    chat: Arc<dyn ChatStore>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService").finish()
    }
}

impl ChatService {
    pub fn new(chat: Arc<dyn ChatStore>) -> Self {
        Self { chat }
    }

    pub async fn send(
        &self,
        room_id: &RoomId,
        sender: &UserRef,
        content: &str,
    ) -> Result<ChatMessage> {
        validation::validate_chat_content(content)?;

        let message = ChatMessage::new(sender, content);
        self.chat.append(room_id, message.clone()).await?;

        tracing::debug!(
            room_id = %room_id,
            user_id = %sender.id,
            "Chat message sent"
        );
        Ok(message)
    }

    pub async fn history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>> {
        self.chat.fetch_all(room_id).await
    }

    pub async fn subscribe(&self, room_id: &RoomId) -> Result<ChatSubscription> {
        self.chat.subscribe(room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_send_and_subscribe() {
        let store = Arc::new(MemoryStore::new());
        let service = ChatService::new(store);
        let room_id = RoomId::from("r1");
        let alice = UserRef::listener(UserId::from("u1"), "Alice");

        let mut sub = service.subscribe(&room_id).await.unwrap();

        service.send(&room_id, &alice, "hello").await.unwrap();
        let messages = sub.next().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[0].nickname, "Alice");

        assert_eq!(service.history(&room_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_rejects_empty_content() {
        let store = Arc::new(MemoryStore::new());
        let service = ChatService::new(store);
        let alice = UserRef::listener(UserId::from("u1"), "Alice");

        assert!(service
            .send(&RoomId::from("r1"), &alice, "  \n")
            .await
            .is_err());
    }
}
