//! Activity logging service
//!
//! Appends audit records for media and slide transitions. Appends are
//! fire-and-forget: the state transition that produced a record must never
//! wait on the store.

use std::sync::Arc;

use crate::models::{ActivityKind, ActivityLogEntry, RoomId};
use crate::store::ActivityLogStore;

#[derive(Clone)]
pub struct ActivityLogService {
    store: Arc<dyn ActivityLogStore>,
}

impl std::fmt::Debug for ActivityLogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLogService").finish()
    }
}

impl ActivityLogService {
    pub fn new(store: Arc<dyn ActivityLogStore>) -> Self {
        Self { store }
    }

    /// Append an activity record without blocking the caller.
    ///
    /// Failures are logged at warn level and otherwise dropped; an audit
    /// append never fails a state transition.
    pub fn record(&self, room: &RoomId, kind: ActivityKind, value: impl Into<String>) {
        let store = self.store.clone();
        let room = room.clone();
        let entry = ActivityLogEntry::new(kind, value);
        tokio::spawn(async move {
            if let Err(e) = store.append(&room, entry).await {
                tracing::warn!(
                    error = %e,
                    room_id = %room,
                    "Failed to append activity log entry"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_record_appends_without_blocking() {
        let store = Arc::new(MemoryStore::new());
        let service = ActivityLogService::new(store.clone());
        let room_id = RoomId::from("r1");

        service.record(&room_id, ActivityKind::SpeakerSlide, "move to 1");
        service.record(
            &room_id,
            ActivityKind::ListenerSlide {
                user_id: UserId::from("u1"),
            },
            "sync",
        );

        // Appends run on detached tasks; let them drain.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let entries = ActivityLogStore::fetch_all(store.as_ref(), &room_id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, "move to 1");
    }
}
