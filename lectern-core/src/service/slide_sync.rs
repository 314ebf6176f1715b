//! Slide synchronization protocol
//!
//! The speaker's page is authoritative and lives on the room document; each
//! listener keeps a private overlay so they can browse independently and
//! come back to the live point with one action. The speaker never learns
//! about listener-local browsing except through the slide-position
//! subcollection, so listener navigation costs no fan-out.
//!
//! Page moves are boundary-clamped at every layer: an attempt to move
//! outside `[0, len)` is a silent no-op, never an error.

use std::sync::Arc;

use crate::models::{
    ActivityKind, Room, RoomId, Slide, SlidePosition, UserId, VideoRef,
};
use crate::store::{RoomStore, SlidePositionStore};
use crate::service::activity::ActivityLogService;
use crate::{Error, Result};

/// A listener's slide-following state relative to the speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Mirroring the speaker's authoritative page and video
    Synced,
    /// Browsing independently; the authoritative state is ignored until
    /// resync (deck removal excepted)
    Desynced,
}

/// Wiring for both halves of the protocol.
#[derive(Clone)]
pub struct SlideSyncService {
    rooms: Arc<dyn RoomStore>,
    positions: Arc<dyn SlidePositionStore>,
    activity: ActivityLogService,
}

impl std::fmt::Debug for SlideSyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideSyncService").finish()
    }
}

impl SlideSyncService {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        positions: Arc<dyn SlidePositionStore>,
        activity: ActivityLogService,
    ) -> Self {
        Self {
            rooms,
            positions,
            activity,
        }
    }

    /// The speaker's write capability over the authoritative deck state.
    ///
    /// Handing this out is the caller's authorization decision; holding it
    /// is what makes a participant the slide authority.
    pub fn speaker_control(&self, room_id: RoomId) -> SpeakerSlideControl {
        SpeakerSlideControl {
            room_id,
            rooms: self.rooms.clone(),
            activity: self.activity.clone(),
        }
    }

    /// A listener's private overlay over the authoritative deck state.
    pub fn follower(&self, room_id: RoomId, user_id: UserId) -> SlideFollower {
        SlideFollower {
            room_id,
            user_id,
            positions: self.positions.clone(),
            activity: self.activity.clone(),
            state: SyncState::Synced,
            local_slides: None,
            local_page: None,
            local_video: None,
            speaker_slides: None,
            speaker_page: None,
            speaker_video: None,
        }
    }
}

/// Write capability over `current_page`/`playing_video`/`slides`.
///
/// Only the speaker's session holds one, which is what keeps the
/// disjoint-writer convention on the room aggregate enforceable.
pub struct SpeakerSlideControl {
    room_id: RoomId,
    rooms: Arc<dyn RoomStore>,
    activity: ActivityLogService,
}

impl std::fmt::Debug for SpeakerSlideControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeakerSlideControl")
            .field("room_id", &self.room_id)
            .finish()
    }
}

impl SpeakerSlideControl {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Activate a deck; every participant starts on page 0.
    pub async fn start_deck(&self, slides: Vec<Slide>) -> Result<()> {
        self.rooms.set_slides(&self.room_id, slides).await?;
        self.activity
            .record(&self.room_id, ActivityKind::SpeakerSlide, "start");
        Ok(())
    }

    /// Deactivate the deck, clearing page and video with it.
    pub async fn stop_deck(&self) -> Result<()> {
        self.rooms.clear_slides(&self.room_id).await?;
        self.activity
            .record(&self.room_id, ActivityKind::SpeakerSlide, "stop");
        Ok(())
    }

    /// Advance the authoritative page. Returns the new page, or `None` when
    /// the move was clamped at the last slide (or no deck is active).
    pub async fn next_page(&self) -> Result<Option<usize>> {
        self.shift_page(1).await
    }

    /// Step the authoritative page back. Returns the new page, or `None`
    /// when the move was clamped at page 0 (or no deck is active).
    pub async fn prev_page(&self) -> Result<Option<usize>> {
        self.shift_page(-1).await
    }

    async fn shift_page(&self, delta: isize) -> Result<Option<usize>> {
        let room = self.fetch().await?;
        let (Some(page), len) = (room.current_page, room.page_count()) else {
            return Ok(None);
        };

        let target = page as isize + delta;
        if target < 0 || target as usize >= len {
            // Boundary clamp: silently ignored, not an error.
            return Ok(None);
        }
        let target = target as usize;

        // Switching slides always stops any in-flight video, and the stop
        // must land before the page write.
        if room.playing_video.is_some() {
            self.rooms.set_playing_video(&self.room_id, None).await?;
        }
        self.rooms.set_current_page(&self.room_id, target).await?;

        self.activity.record(
            &self.room_id,
            ActivityKind::SpeakerSlide,
            format!("move to {target}"),
        );
        Ok(Some(target))
    }

    /// Show `video` instead of the current slide image, for everyone synced.
    pub async fn play_video(&self, video: VideoRef) -> Result<()> {
        let room = self.fetch().await?;
        let current = room
            .current_slide()
            .ok_or_else(|| Error::InvalidInput("No active deck".to_string()))?;
        if !current.has_video(&video) {
            return Err(Error::InvalidInput(format!(
                "Video {} is not attached to the current slide",
                video.id
            )));
        }
        self.rooms
            .set_playing_video(&self.room_id, Some(video))
            .await
    }

    /// Back to the slide image.
    pub async fn stop_video(&self) -> Result<()> {
        self.rooms.set_playing_video(&self.room_id, None).await
    }

    async fn fetch(&self) -> Result<Room> {
        self.rooms
            .fetch(&self.room_id)
            .await?
            .ok_or_else(|| Error::room_not_found(&self.room_id))
    }
}

/// Per-listener sync/desync overlay.
///
/// While `Synced` the follower mirrors every room snapshot wholesale. While
/// `Desynced` it keeps the deck copy it captured at desync time and browses
/// it locally; only deck removal reaches through. The authoritative
/// document is never written from here — the follower owns exactly its own
/// slide-position record.
pub struct SlideFollower {
    room_id: RoomId,
    user_id: UserId,
    positions: Arc<dyn SlidePositionStore>,
    activity: ActivityLogService,

    state: SyncState,
    local_slides: Option<Vec<Slide>>,
    local_page: Option<usize>,
    local_video: Option<VideoRef>,

    // Latest authoritative values, tracked across snapshots so resync can
    // adopt them without another fetch.
    speaker_slides: Option<Vec<Slide>>,
    speaker_page: Option<usize>,
    speaker_video: Option<VideoRef>,
}

impl std::fmt::Debug for SlideFollower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideFollower")
            .field("room_id", &self.room_id)
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .field("local_page", &self.local_page)
            .finish()
    }
}

impl SlideFollower {
    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    /// The page this listener is currently looking at.
    pub fn current_page(&self) -> Option<usize> {
        self.local_page
    }

    pub fn playing_video(&self) -> Option<&VideoRef> {
        self.local_video.as_ref()
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.local_slides.as_deref()?.get(self.local_page?)
    }

    /// Record the synced baseline document. Called once when the slide view
    /// opens; absence of the document means synced anyway, so this is purely
    /// declarative.
    pub async fn register(&self) -> Result<()> {
        self.positions
            .upsert(&self.room_id, SlidePosition::synced(self.user_id.clone()))
            .await
    }

    /// Apply an authoritative room snapshot.
    ///
    /// Deliveries replace local state wholesale while synced. A desynced
    /// follower keeps browsing its captured deck and ignores the snapshot,
    /// except that deck removal always clears the overlay.
    pub fn observe_room(&mut self, room: &Room) {
        self.speaker_slides = room.slides.clone();
        self.speaker_page = room.current_page;
        self.speaker_video = room.playing_video.clone();

        if room.slides.is_none() {
            self.local_slides = None;
            self.local_page = None;
            self.local_video = None;
            return;
        }

        if self.state == SyncState::Synced {
            self.local_slides = self.speaker_slides.clone();
            self.local_page = self.speaker_page;
            self.local_video = self.speaker_video.clone();
        }
    }

    /// Browse forward. While synced this first desyncs (the authoritative
    /// page is untouched), then moves locally. Clamped at the last page.
    pub async fn next_page(&mut self) -> Result<Option<usize>> {
        self.shift_page(1).await
    }

    /// Browse backward. Same desync-then-move behavior, clamped at page 0.
    pub async fn prev_page(&mut self) -> Result<Option<usize>> {
        self.shift_page(-1).await
    }

    async fn shift_page(&mut self, delta: isize) -> Result<Option<usize>> {
        let (Some(page), Some(len)) = (
            self.local_page,
            self.local_slides.as_ref().map(Vec::len),
        ) else {
            return Ok(None);
        };

        let target = page as isize + delta;
        if target < 0 || target as usize >= len {
            return Ok(None);
        }
        let target = target as usize;

        // Desync (or re-record the new position) before the local move, so
        // the speaker-visible record never runs ahead of what we show.
        self.positions
            .upsert(
                &self.room_id,
                SlidePosition::desynced(self.user_id.clone(), target),
            )
            .await?;
        self.state = SyncState::Desynced;
        self.local_page = Some(target);
        self.local_video = None;

        self.activity.record(
            &self.room_id,
            ActivityKind::ListenerSlide {
                user_id: self.user_id.clone(),
            },
            format!("move to {target}"),
        );
        Ok(Some(target))
    }

    /// Leave the speaker's flow, keeping the current page as the independent
    /// baseline. No-op while already desynced.
    pub async fn unsync(&mut self) -> Result<()> {
        if self.state == SyncState::Desynced {
            return Ok(());
        }
        let Some(page) = self.local_page else {
            // No deck, nothing to browse independently.
            return Ok(());
        };

        self.positions
            .upsert(
                &self.room_id,
                SlidePosition::desynced(self.user_id.clone(), page),
            )
            .await?;
        self.state = SyncState::Desynced;

        self.activity.record(
            &self.room_id,
            ActivityKind::ListenerSlide {
                user_id: self.user_id.clone(),
            },
            "unsync",
        );
        Ok(())
    }

    /// Return to the speaker's live point, adopting the authoritative page
    /// and video as they are right now (copy, not merge). Idempotent.
    pub async fn resync(&mut self) -> Result<()> {
        self.positions
            .upsert(&self.room_id, SlidePosition::synced(self.user_id.clone()))
            .await?;
        self.state = SyncState::Synced;
        self.local_slides = self.speaker_slides.clone();
        self.local_page = self.speaker_page;
        self.local_video = self.speaker_video.clone();

        self.activity.record(
            &self.room_id,
            ActivityKind::ListenerSlide {
                user_id: self.user_id.clone(),
            },
            "sync",
        );
        Ok(())
    }

    /// Play a video from the current slide, locally only. A synced listener
    /// never controls video independently.
    pub fn select_video(&mut self, video: VideoRef) -> Result<()> {
        if self.state == SyncState::Synced {
            return Err(Error::InvalidInput(
                "A synced listener mirrors the speaker's video".to_string(),
            ));
        }
        let current = self
            .current_slide()
            .ok_or_else(|| Error::InvalidInput("No active deck".to_string()))?;
        if !current.has_video(&video) {
            return Err(Error::InvalidInput(format!(
                "Video {} is not attached to the current slide",
                video.id
            )));
        }
        self.local_video = Some(video);
        Ok(())
    }

    /// Stop the locally playing video. Same restriction as selecting one.
    pub fn stop_video(&mut self) -> Result<()> {
        if self.state == SyncState::Synced {
            return Err(Error::InvalidInput(
                "A synced listener mirrors the speaker's video".to_string(),
            ));
        }
        self.local_video = None;
        Ok(())
    }
}
