//! Listener session
//!
//! The subscribing half: a receive-only relay join with the single
//! displayable stream slot, and a slide follower that mirrors the speaker
//! by default and browses independently on demand. Departure is
//! best-effort: the listener always gets out, even when a leave-time
//! deletion fails.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

use lectern_core::models::{ChatMessage, Room, RoomId, UserRef, VideoRef};
use lectern_core::service::{ChatService, PresenceService, SlideFollower};
use lectern_relay::{RelayRoomId, RemoteStream, SubscribingSession};

use crate::coordinator::{SessionCoordinator, SessionEvent};
use crate::error::{Result, SessionError};

/// A listener's entered session.
pub struct ListenerSession {
    room_id: RoomId,
    user: UserRef,
    snapshots: watch::Receiver<Room>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    watch_task: tokio::task::JoinHandle<()>,
    follow_task: tokio::task::JoinHandle<()>,
    follower: Arc<Mutex<SlideFollower>>,
    subscriber: SubscribingSession,
    chat: ChatService,
    presence: PresenceService,
}

impl std::fmt::Debug for ListenerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSession")
            .field("room_id", &self.room_id)
            .field("user_id", &self.user.id)
            .finish()
    }
}

impl ListenerSession {
    pub(crate) async fn open(
        c: &SessionCoordinator,
        room: Room,
        user: UserRef,
    ) -> Result<Self> {
        let watch = c.watch_room(&room).await?;

        let wired = async {
            let subscriber = SubscribingSession::join(
                RelayRoomId::from(room.id.as_str()),
                c.connector.clone(),
                &c.relay_config(),
            )
            .await?;

            let mut follower = c.slide_sync.follower(room.id.clone(), user.id.clone());
            follower.register().await?;
            // Adopt the snapshot the watch started from; the follow task
            // keeps up with later deliveries.
            follower.observe_room(&watch.snapshots.borrow().clone());
            Ok::<_, SessionError>((subscriber, follower))
        }
        .await;
        let (subscriber, follower) = match wired {
            Ok(parts) => parts,
            Err(e) => {
                watch.task.abort();
                return Err(e);
            }
        };
        let follower = Arc::new(Mutex::new(follower));

        let mut snapshots = watch.snapshots.clone();
        let follow = follower.clone();
        let follow_task = tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                follow.lock().await.observe_room(&snapshot);
            }
        });

        tracing::info!(room_id = %room.id, user_id = %user.id, "Listener entered");
        Ok(Self {
            room_id: room.id,
            user,
            snapshots: watch.snapshots,
            events: watch.events,
            watch_task: watch.task,
            follow_task,
            follower,
            subscriber,
            chat: c.chat.clone(),
            presence: c.presence.clone(),
        })
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn user(&self) -> &UserRef {
        &self.user
    }

    /// The latest room snapshot.
    pub fn room(&self) -> Room {
        self.snapshots.borrow().clone()
    }

    /// Wait for the next session event. `Ended` means the speaker archived
    /// the room; this session should be left.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    // Slide browsing. Navigation while synced first records the desync,
    // then moves locally; the authoritative page is never written from a
    // listener session.

    pub async fn next_page(&self) -> Result<Option<usize>> {
        Ok(self.follower.lock().await.next_page().await?)
    }

    pub async fn prev_page(&self) -> Result<Option<usize>> {
        Ok(self.follower.lock().await.prev_page().await?)
    }

    /// Leave the speaker's flow, keeping the current page as the
    /// independent baseline.
    pub async fn unsync(&self) -> Result<()> {
        Ok(self.follower.lock().await.unsync().await?)
    }

    /// Return to the speaker's live point as it is right now.
    pub async fn resync(&self) -> Result<()> {
        Ok(self.follower.lock().await.resync().await?)
    }

    /// Play a video from the current slide, locally only. Rejected while
    /// synced: a synced listener mirrors the speaker's video.
    pub async fn select_video(&self, video: VideoRef) -> Result<()> {
        Ok(self.follower.lock().await.select_video(video)?)
    }

    pub async fn stop_video(&self) -> Result<()> {
        Ok(self.follower.lock().await.stop_video()?)
    }

    /// The page this listener is currently looking at.
    pub async fn current_page(&self) -> Option<usize> {
        self.follower.lock().await.current_page()
    }

    pub async fn is_synced(&self) -> bool {
        self.follower.lock().await.is_synced()
    }

    pub async fn playing_video(&self) -> Option<VideoRef> {
        self.follower.lock().await.playing_video().cloned()
    }

    /// The speaker's stream currently occupying the display slot.
    pub fn remote_stream(&self) -> Option<RemoteStream> {
        self.subscriber.current_stream()
    }

    /// A feed of display-slot changes.
    pub fn remote_streams(&self) -> watch::Receiver<Option<RemoteStream>> {
        self.subscriber.streams()
    }

    pub async fn send_chat(&self, content: &str) -> Result<ChatMessage> {
        Ok(self.chat.send(&self.room_id, &self.user, content).await?)
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    /// Leave the session: release every subscription and task, leave the
    /// relay, remove the listener from the membership set, and delete the
    /// listener's per-room documents best-effort.
    ///
    /// Both deletions are always attempted; a partial failure comes back as
    /// `CleanupPartialFailure` after the listener is already out, and must
    /// not be treated as "still in the session".
    pub async fn leave(self) -> Result<()> {
        self.watch_task.abort();
        self.follow_task.abort();
        if let Err(e) = self.subscriber.leave().await {
            tracing::warn!(error = %e, room_id = %self.room_id, "Failed to leave relay room");
        }

        self.presence.leave(&self.room_id, &self.user.id).await?;
        let report = self
            .presence
            .cleanup_listener(&self.room_id, &self.user.id)
            .await;
        tracing::info!(room_id = %self.room_id, user_id = %self.user.id, "Listener left");

        if report.is_clean() {
            Ok(())
        } else {
            Err(SessionError::CleanupPartialFailure {
                analysis: report.analysis.map(|e| e.to_string()),
                slide_position: report.slide_position.map(|e| e.to_string()),
            })
        }
    }
}

impl Drop for ListenerSession {
    fn drop(&mut self) {
        self.watch_task.abort();
        self.follow_task.abort();
    }
}
