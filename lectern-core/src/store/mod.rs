//! Document store contracts
//!
//! Typed, per-collection seams over the external document store. Each trait
//! covers one collection and exposes only the writes its owners perform:
//! membership is mutated through atomic set operations, the deck fields only
//! through the page/video setters, subcollection documents by keyed upsert
//! and delete.
//!
//! Subscriptions deliver the **current full state**, not deltas: every
//! delivery replaces whatever the consumer held before, and intermediate
//! states may be coalesced away. No ordering holds across independent
//! subscriptions.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::models::{
    ActivityLogEntry, AnalysisLogEntry, AnalysisSample, ChatMessage, Room, RoomId, Slide,
    SlidePosition, UserId, UserRef, VideoRef,
};
use crate::Result;

/// A live feed of full snapshots of one collection or document.
///
/// The newest snapshot is always readable through [`current`](Self::current);
/// [`next`](Self::next) suspends until a delivery newer than the last one
/// seen arrives. Dropping the subscription releases the underlying listener;
/// [`unsubscribe`](Self::unsubscribe) does the same thing by name so
/// teardown paths can release deterministically.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// The latest delivered snapshot.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next delivery and return the then-current snapshot.
    ///
    /// Returns `None` once the feed is closed; a stalled store simply never
    /// resolves, which is the caller's cue to time out or tear down.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Release the listener.
    pub fn unsubscribe(self) {}
}

pub type RoomSubscription = Subscription<Room>;
pub type SlidePositionSubscription = Subscription<Vec<SlidePosition>>;
pub type ChatSubscription = Subscription<Vec<ChatMessage>>;

/// The `rooms/{id}` root aggregate.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert a freshly created room. Fails with `AlreadyExists` on id reuse.
    async fn insert(&self, room: Room) -> Result<()>;

    async fn fetch(&self, id: &RoomId) -> Result<Option<Room>>;

    async fn fetch_all(&self) -> Result<Vec<Room>>;

    /// Atomic set union on `users`, keyed by user id. Adding a user already
    /// present is a no-op.
    async fn add_user(&self, id: &RoomId, user: UserRef) -> Result<()>;

    /// Atomic set remove on `users`, keyed by user id. Removing an absent
    /// user is a no-op.
    async fn remove_user(&self, id: &RoomId, user_id: &UserId) -> Result<()>;

    /// Activate a deck: installs `slides`, resets `current_page` to 0 and
    /// clears `playing_video`.
    async fn set_slides(&self, id: &RoomId, slides: Vec<Slide>) -> Result<()>;

    /// Deactivate the deck: clears `slides`, `current_page` and
    /// `playing_video` together.
    async fn clear_slides(&self, id: &RoomId) -> Result<()>;

    /// Write the authoritative page index. Rejects out-of-range indices and
    /// writes without an active deck.
    async fn set_current_page(&self, id: &RoomId, page: usize) -> Result<()>;

    async fn set_playing_video(&self, id: &RoomId, video: Option<VideoRef>) -> Result<()>;

    async fn set_max_attendees(&self, id: &RoomId, count: usize) -> Result<()>;

    /// Mark the room archived. Terminal and idempotent; never deletes.
    async fn archive(&self, id: &RoomId) -> Result<()>;

    async fn subscribe(&self, id: &RoomId) -> Result<RoomSubscription>;
}

/// The `rooms/{id}/slide-position/{userId}` subcollection.
#[async_trait]
pub trait SlidePositionStore: Send + Sync {
    async fn upsert(&self, room: &RoomId, position: SlidePosition) -> Result<()>;

    /// Idempotent: deleting an absent document succeeds.
    async fn delete(&self, room: &RoomId, user: &UserId) -> Result<()>;

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<SlidePosition>>;

    async fn subscribe(&self, room: &RoomId) -> Result<SlidePositionSubscription>;
}

/// The `rooms/{id}/analysis/{userId}` samples and the `analysis-log`
/// aggregate feed.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn upsert(&self, room: &RoomId, sample: AnalysisSample) -> Result<()>;

    /// Idempotent: deleting an absent document succeeds.
    async fn delete(&self, room: &RoomId, user: &UserId) -> Result<()>;

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<AnalysisSample>>;

    async fn append_log(&self, room: &RoomId, entry: AnalysisLogEntry) -> Result<()>;

    async fn fetch_log(&self, room: &RoomId) -> Result<Vec<AnalysisLogEntry>>;
}

/// The `rooms/{id}/chat` append-only feed.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append(&self, room: &RoomId, message: ChatMessage) -> Result<()>;

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<ChatMessage>>;

    async fn subscribe(&self, room: &RoomId) -> Result<ChatSubscription>;
}

/// The `rooms/{id}/log` audit records.
#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    async fn append(&self, room: &RoomId, entry: ActivityLogEntry) -> Result<()>;

    async fn fetch_all(&self, room: &RoomId) -> Result<Vec<ActivityLogEntry>>;
}
