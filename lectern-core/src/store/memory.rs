//! In-memory reference store
//!
//! Backs every store contract with process-local state and `watch`-channel
//! snapshot cells. Each cell holds the latest full state of its document or
//! collection; writers replace the cell atomically and subscribers read it
//! wholesale, which reproduces the external store's at-least-once,
//! coalescing delivery. Unit tests and local wiring run against this store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

use async_trait::async_trait;

use super::{
    ActivityLogStore, AnalysisStore, ChatStore, ChatSubscription, RoomStore, RoomSubscription,
    SlidePositionStore, SlidePositionSubscription, Subscription,
};
use crate::models::{
    ActivityLogEntry, AnalysisLogEntry, AnalysisSample, ChatMessage, Room, RoomId, Slide,
    SlidePosition, UserId, UserRef, VideoRef,
};
use crate::{Error, Result};

/// Process-local implementation of all store contracts.
///
/// Subcollections are independent of the parent document, as in the external
/// store: writing a slide position for a room that was never inserted
/// succeeds and simply creates the collection.
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<RoomId, watch::Sender<Room>>,
    positions: DashMap<RoomId, watch::Sender<Vec<SlidePosition>>>,
    samples: DashMap<RoomId, Vec<AnalysisSample>>,
    analysis_log: DashMap<RoomId, Vec<AnalysisLogEntry>>,
    chat: DashMap<RoomId, watch::Sender<Vec<ChatMessage>>>,
    activity: DashMap<RoomId, Vec<ActivityLogEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to the room under its cell lock and publish the result as
    /// one snapshot. Fails with `NotFound` when the room was never inserted.
    fn update_room<F>(&self, id: &RoomId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Room) -> Result<()>,
    {
        let tx = self
            .rooms
            .get(id)
            .ok_or_else(|| Error::room_not_found(id))?;
        let mut room = tx.borrow().clone();
        f(&mut room)?;
        tx.send_replace(room);
        Ok(())
    }

    fn positions_cell(
        &self,
        room: &RoomId,
    ) -> dashmap::mapref::one::RefMut<'_, RoomId, watch::Sender<Vec<SlidePosition>>> {
        self.positions
            .entry(room.clone())
            .or_insert_with(|| watch::channel(Vec::new()).0)
    }

    fn chat_cell(
        &self,
        room: &RoomId,
    ) -> dashmap::mapref::one::RefMut<'_, RoomId, watch::Sender<Vec<ChatMessage>>> {
        self.chat
            .entry(room.clone())
            .or_insert_with(|| watch::channel(Vec::new()).0)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn insert(&self, room: Room) -> Result<()> {
        match self.rooms.entry(room.id.clone()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists(format!(
                "Room {} already exists",
                room.id
            ))),
            Entry::Vacant(entry) => {
                entry.insert(watch::channel(room).0);
                Ok(())
            }
        }
    }

    async fn fetch(&self, id: &RoomId) -> Result<Option<Room>> {
        Ok(self.rooms.get(id).map(|tx| tx.borrow().clone()))
    }

    async fn fetch_all(&self) -> Result<Vec<Room>> {
        let mut rooms: Vec<Room> = self
            .rooms
            .iter()
            .map(|entry| entry.value().borrow().clone())
            .collect();
        rooms.sort_by_key(|r| r.timestamp);
        Ok(rooms)
    }

    async fn add_user(&self, id: &RoomId, user: UserRef) -> Result<()> {
        self.update_room(id, |room| {
            if !room.contains_user(&user.id) {
                room.users.push(user);
            }
            Ok(())
        })
    }

    async fn remove_user(&self, id: &RoomId, user_id: &UserId) -> Result<()> {
        self.update_room(id, |room| {
            room.users.retain(|u| u.id != *user_id);
            Ok(())
        })
    }

    async fn set_slides(&self, id: &RoomId, slides: Vec<Slide>) -> Result<()> {
        self.update_room(id, |room| {
            if slides.is_empty() {
                return Err(Error::InvalidInput("Deck must have at least one slide".to_string()));
            }
            room.slides = Some(slides);
            room.current_page = Some(0);
            room.playing_video = None;
            Ok(())
        })
    }

    async fn clear_slides(&self, id: &RoomId) -> Result<()> {
        self.update_room(id, |room| {
            room.slides = None;
            room.current_page = None;
            room.playing_video = None;
            Ok(())
        })
    }

    async fn set_current_page(&self, id: &RoomId, page: usize) -> Result<()> {
        self.update_room(id, |room| {
            let len = room.page_count();
            if room.slides.is_none() {
                return Err(Error::InvalidInput("No active deck".to_string()));
            }
            if page >= len {
                return Err(Error::InvalidInput(format!(
                    "Page {page} out of range for {len}-slide deck"
                )));
            }
            room.current_page = Some(page);
            Ok(())
        })
    }

    async fn set_playing_video(&self, id: &RoomId, video: Option<VideoRef>) -> Result<()> {
        self.update_room(id, |room| {
            room.playing_video = video;
            Ok(())
        })
    }

    async fn set_max_attendees(&self, id: &RoomId, count: usize) -> Result<()> {
        self.update_room(id, |room| {
            room.max_attendees = room.max_attendees.max(count);
            Ok(())
        })
    }

    async fn archive(&self, id: &RoomId) -> Result<()> {
        self.update_room(id, |room| {
            room.is_archived = true;
            Ok(())
        })
    }

    async fn subscribe(&self, id: &RoomId) -> Result<RoomSubscription> {
        let tx = self
            .rooms
            .get(id)
            .ok_or_else(|| Error::room_not_found(id))?;
        Ok(Subscription::new(tx.subscribe()))
    }
}

#[async_trait]
impl SlidePositionStore for MemoryStore {
    async fn upsert(&self, room: &RoomId, position: SlidePosition) -> Result<()> {
        self.positions_cell(room).send_modify(|positions| {
            match positions.iter_mut().find(|p| p.id == position.id) {
                Some(existing) => *existing = position,
                None => positions.push(position),
            }
        });
        Ok(())
    }

    async fn delete(&self, room: &RoomId, user: &UserId) -> Result<()> {
        if let Some(tx) = self.positions.get(room) {
            tx.send_modify(|positions| positions.retain(|p| p.id != *user));
        }
        Ok(())
    }

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<SlidePosition>> {
        Ok(self
            .positions
            .get(room)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default())
    }

    async fn subscribe(&self, room: &RoomId) -> Result<SlidePositionSubscription> {
        Ok(Subscription::new(self.positions_cell(room).subscribe()))
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn upsert(&self, room: &RoomId, sample: AnalysisSample) -> Result<()> {
        let mut samples = self.samples.entry(room.clone()).or_default();
        match samples.iter_mut().find(|s| s.id == sample.id) {
            Some(existing) => *existing = sample,
            None => samples.push(sample),
        }
        Ok(())
    }

    async fn delete(&self, room: &RoomId, user: &UserId) -> Result<()> {
        if let Some(mut samples) = self.samples.get_mut(room) {
            samples.retain(|s| s.id != *user);
        }
        Ok(())
    }

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<AnalysisSample>> {
        Ok(self
            .samples
            .get(room)
            .map(|s| s.value().clone())
            .unwrap_or_default())
    }

    async fn append_log(&self, room: &RoomId, entry: AnalysisLogEntry) -> Result<()> {
        self.analysis_log.entry(room.clone()).or_default().push(entry);
        Ok(())
    }

    async fn fetch_log(&self, room: &RoomId) -> Result<Vec<AnalysisLogEntry>> {
        Ok(self
            .analysis_log
            .get(room)
            .map(|l| l.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn append(&self, room: &RoomId, message: ChatMessage) -> Result<()> {
        self.chat_cell(room)
            .send_modify(|messages| messages.push(message));
        Ok(())
    }

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<ChatMessage>> {
        Ok(self
            .chat
            .get(room)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default())
    }

    async fn subscribe(&self, room: &RoomId) -> Result<ChatSubscription> {
        Ok(Subscription::new(self.chat_cell(room).subscribe()))
    }
}

#[async_trait]
impl ActivityLogStore for MemoryStore {
    async fn append(&self, room: &RoomId, entry: ActivityLogEntry) -> Result<()> {
        self.activity.entry(room.clone()).or_default().push(entry);
        Ok(())
    }

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<ActivityLogEntry>> {
        Ok(self
            .activity
            .get(room)
            .map(|l| l.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserRef, VideoId, VideoSource};

    async fn new_room(store: &MemoryStore) -> Room {
        let admin = UserRef::speaker(UserId::from("admin1"), "Prof. A");
        let room = Room::new("Lecture", &admin, "pw");
        store.insert(room.clone()).await.unwrap();
        room
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let store = MemoryStore::new();
        let room = new_room(&store).await;

        let fetched = store.fetch(&room.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Lecture");

        assert!(store.fetch(&RoomId::from("missing")).await.unwrap().is_none());

        let err = store.insert(fetched).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_add_user_is_set_union() {
        let store = MemoryStore::new();
        let room = new_room(&store).await;

        let user = UserRef::listener(UserId::from("u1"), "Alice");
        store.add_user(&room.id, user.clone()).await.unwrap();
        store.add_user(&room.id, user.clone()).await.unwrap();

        let fetched = store.fetch(&room.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_count(), 2);

        store.remove_user(&room.id, &user.id).await.unwrap();
        store.remove_user(&room.id, &user.id).await.unwrap();
        let fetched = store.fetch(&room.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_count(), 1);
    }

    #[tokio::test]
    async fn test_set_slides_resets_page_and_video() {
        let store = MemoryStore::new();
        let room = new_room(&store).await;

        store
            .set_slides(&room.id, vec![Slide::new("p0"), Slide::new("p1")])
            .await
            .unwrap();
        store.set_current_page(&room.id, 1).await.unwrap();
        let video = VideoRef::new(VideoId::from("v1"), "Demo", VideoSource::Youtube);
        store
            .set_playing_video(&room.id, Some(video))
            .await
            .unwrap();

        store
            .set_slides(&room.id, vec![Slide::new("q0")])
            .await
            .unwrap();
        let fetched = store.fetch(&room.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_page, Some(0));
        assert!(fetched.playing_video.is_none());
        assert_eq!(fetched.page_count(), 1);
    }

    #[tokio::test]
    async fn test_set_current_page_bounds() {
        let store = MemoryStore::new();
        let room = new_room(&store).await;

        let err = store.set_current_page(&room.id, 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        store
            .set_slides(&room.id, vec![Slide::new("p0"), Slide::new("p1")])
            .await
            .unwrap();
        store.set_current_page(&room.id, 1).await.unwrap();

        let err = store.set_current_page(&room.id, 2).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_subscription_delivers_latest_snapshot() {
        let store = MemoryStore::new();
        let room = new_room(&store).await;

        let mut sub = RoomStore::subscribe(&store, &room.id).await.unwrap();
        assert!(!sub.current().is_archived);

        // Two writes before the subscriber reads: only the latest state is
        // observable (coalescing, last delivery wins).
        store
            .add_user(&room.id, UserRef::listener(UserId::from("u1"), "Alice"))
            .await
            .unwrap();
        store.archive(&room.id).await.unwrap();

        let snapshot = sub.next().await.unwrap();
        assert!(snapshot.is_archived);
        assert_eq!(snapshot.user_count(), 2);
    }

    #[tokio::test]
    async fn test_archive_is_idempotent() {
        let store = MemoryStore::new();
        let room = new_room(&store).await;

        store.archive(&room.id).await.unwrap();
        store.archive(&room.id).await.unwrap();
        assert!(store.fetch(&room.id).await.unwrap().unwrap().is_archived);
    }

    #[tokio::test]
    async fn test_slide_position_upsert_and_delete() {
        let store = MemoryStore::new();
        let room_id = RoomId::from("r1");

        let mut sub = SlidePositionStore::subscribe(&store, &room_id).await.unwrap();
        assert!(sub.current().is_empty());

        SlidePositionStore::upsert(&store, &room_id, SlidePosition::desynced(UserId::from("u1"), 2))
            .await
            .unwrap();
        SlidePositionStore::upsert(&store, &room_id, SlidePosition::synced(UserId::from("u1")))
            .await
            .unwrap();

        let positions = sub.next().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert!(positions[0].is_sync);

        SlidePositionStore::delete(&store, &room_id, &UserId::from("u1"))
            .await
            .unwrap();
        // Deleting again is a no-op, not an error.
        SlidePositionStore::delete(&store, &room_id, &UserId::from("u1"))
            .await
            .unwrap();
        assert!(SlidePositionStore::fetch_all(&store, &room_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_chat_appends_in_order() {
        let store = MemoryStore::new();
        let room_id = RoomId::from("r1");
        let alice = UserRef::listener(UserId::from("u1"), "Alice");

        ChatStore::append(&store, &room_id, ChatMessage::new(&alice, "first"))
            .await
            .unwrap();
        ChatStore::append(&store, &room_id, ChatMessage::new(&alice, "second"))
            .await
            .unwrap();

        let messages = ChatStore::fetch_all(&store, &room_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }
}
