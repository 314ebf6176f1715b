//! Presence service
//!
//! Joins and leaves mutate the room's membership set through the store's
//! atomic union/remove only. Listener departure also clears the listener's
//! per-room subcollection documents; those deletions are independent,
//! best-effort, and must never block navigation away from the session.

use std::sync::Arc;

use crate::models::{RoomId, UserId, UserRef};
use crate::store::{AnalysisStore, RoomStore, SlidePositionStore};
use crate::{Error, Result};

/// Outcome of the best-effort listener cleanup.
///
/// Both deletions are always attempted; either may have failed.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub analysis: Option<Error>,
    pub slide_position: Option<Error>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.analysis.is_none() && self.slide_position.is_none()
    }
}

#[derive(Clone)]
pub struct PresenceService {
    rooms: Arc<dyn RoomStore>,
    positions: Arc<dyn SlidePositionStore>,
    analysis: Arc<dyn AnalysisStore>,
}

impl std::fmt::Debug for PresenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceService").finish()
    }
}

impl PresenceService {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        positions: Arc<dyn SlidePositionStore>,
        analysis: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            rooms,
            positions,
            analysis,
        }
    }

    /// Add the participant to the membership set (atomic union).
    pub async fn join(&self, room_id: &RoomId, user: UserRef) -> Result<()> {
        let user_id = user.id.clone();
        self.rooms.add_user(room_id, user).await?;
        tracing::debug!(room_id = %room_id, user_id = %user_id, "Participant joined");
        Ok(())
    }

    /// Remove the participant from the membership set (atomic remove).
    pub async fn leave(&self, room_id: &RoomId, user_id: &UserId) -> Result<()> {
        self.rooms.remove_user(room_id, user_id).await?;
        tracing::debug!(room_id = %room_id, user_id = %user_id, "Participant left");
        Ok(())
    }

    /// Delete the listener's AnalysisSample and SlidePosition documents.
    ///
    /// The two deletions run concurrently and are independent: one failing
    /// never suppresses the other. Failures land in the report and a warn
    /// log; the caller decides whether to surface them, but they are never
    /// fatal to leaving.
    pub async fn cleanup_listener(&self, room_id: &RoomId, user_id: &UserId) -> CleanupReport {
        let (analysis, slide_position) = futures::future::join(
            self.analysis.delete(room_id, user_id),
            self.positions.delete(room_id, user_id),
        )
        .await;

        let report = CleanupReport {
            analysis: analysis.err(),
            slide_position: slide_position.err(),
        };

        if let Some(e) = &report.analysis {
            tracing::warn!(
                error = %e,
                room_id = %room_id,
                user_id = %user_id,
                "Failed to delete analysis sample on leave"
            );
        }
        if let Some(e) = &report.slide_position {
            tracing::warn!(
                error = %e,
                room_id = %room_id,
                user_id = %user_id,
                "Failed to delete slide position on leave"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisSample, Room, SlidePosition};
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    /// Analysis store that always fails deletion, for partial-failure tests.
    struct FailingAnalysisStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl AnalysisStore for FailingAnalysisStore {
        async fn upsert(&self, room: &RoomId, sample: AnalysisSample) -> Result<()> {
            AnalysisStore::upsert(self.inner.as_ref(), room, sample).await
        }

        async fn delete(&self, _room: &RoomId, _user: &UserId) -> Result<()> {
            Err(Error::Store("simulated outage".to_string()))
        }

        async fn fetch_all(&self, room: &RoomId) -> Result<Vec<AnalysisSample>> {
            AnalysisStore::fetch_all(self.inner.as_ref(), room).await
        }

        async fn append_log(
            &self,
            room: &RoomId,
            entry: crate::models::AnalysisLogEntry,
        ) -> Result<()> {
            self.inner.append_log(room, entry).await
        }

        async fn fetch_log(&self, room: &RoomId) -> Result<Vec<crate::models::AnalysisLogEntry>> {
            self.inner.fetch_log(room).await
        }
    }

    async fn seeded_room(store: &MemoryStore) -> Room {
        let admin = UserRef::speaker(UserId::from("admin1"), "Prof. A");
        let room = Room::new("Lecture", &admin, "pw");
        store.insert(room.clone()).await.unwrap();
        room
    }

    #[tokio::test]
    async fn test_join_and_leave() {
        let store = Arc::new(MemoryStore::new());
        let room = seeded_room(&store).await;
        let service = PresenceService::new(store.clone(), store.clone(), store.clone());

        let user = UserRef::listener(UserId::from("u1"), "Alice");
        service.join(&room.id, user.clone()).await.unwrap();
        assert_eq!(store.fetch(&room.id).await.unwrap().unwrap().user_count(), 2);

        service.leave(&room.id, &user.id).await.unwrap();
        assert_eq!(store.fetch(&room.id).await.unwrap().unwrap().user_count(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_deletes_both_documents() {
        let store = Arc::new(MemoryStore::new());
        let room = seeded_room(&store).await;
        let service = PresenceService::new(store.clone(), store.clone(), store.clone());
        let user_id = UserId::from("u1");

        AnalysisStore::upsert(store.as_ref(), &room.id, AnalysisSample::neutral(user_id.clone()))
            .await
            .unwrap();
        SlidePositionStore::upsert(
            store.as_ref(),
            &room.id,
            SlidePosition::desynced(user_id.clone(), 1),
        )
        .await
        .unwrap();

        let report = service.cleanup_listener(&room.id, &user_id).await;
        assert!(report.is_clean());
        assert!(AnalysisStore::fetch_all(store.as_ref(), &room.id)
            .await
            .unwrap()
            .is_empty());
        assert!(SlidePositionStore::fetch_all(store.as_ref(), &room.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_attempts_both_when_one_fails() {
        let store = Arc::new(MemoryStore::new());
        let room = seeded_room(&store).await;
        let failing = Arc::new(FailingAnalysisStore {
            inner: store.clone(),
        });
        let service = PresenceService::new(store.clone(), store.clone(), failing);
        let user_id = UserId::from("u1");

        SlidePositionStore::upsert(
            store.as_ref(),
            &room.id,
            SlidePosition::desynced(user_id.clone(), 1),
        )
        .await
        .unwrap();

        let report = service.cleanup_listener(&room.id, &user_id).await;
        assert!(!report.is_clean());
        assert!(report.analysis.is_some());
        assert!(report.slide_position.is_none());

        // The slide position deletion still went through.
        assert!(SlidePositionStore::fetch_all(store.as_ref(), &room.id)
            .await
            .unwrap()
            .is_empty());
    }
}
