//! Speaker session
//!
//! The publishing half: holds the relay publisher, the write capability
//! over the authoritative deck state, the slide-position overview of the
//! audience, and the audience-analysis aggregator. Departure archives the
//! room, the terminal signal every listener reacts to, and never deletes
//! it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use lectern_core::models::{
    ActivityKind, ChatMessage, EmotionSummary, Room, RoomId, Slide, SlidePosition, UserRef,
    VideoRef,
};
use lectern_core::service::{
    ActivityLogService, AggregatorHandle, ChatService, PresenceService, RoomService,
    SpeakerSlideControl,
};
use lectern_core::store::SlidePositionSubscription;
use lectern_relay::{
    CameraConstraints, DisplayConstraints, MediaEvent, MediaEventSink, MediaSource,
    PublishingSession, RelayRoomId,
};

use crate::coordinator::{SessionCoordinator, SessionEvent};
use crate::error::Result;

/// Bridges the publisher's media events into the room's activity log.
/// Appends are detached; a media transition never waits on the store.
struct ActivityMediaSink {
    room_id: RoomId,
    activity: ActivityLogService,
}

impl MediaEventSink for ActivityMediaSink {
    fn emit(&self, event: MediaEvent) {
        let (kind, value) = match event {
            MediaEvent::SourceStarted(source) => {
                (ActivityKind::MediaSource, format!("{} start", source.label()))
            }
            MediaEvent::SourceSwitched { from, to } => (
                ActivityKind::MediaSource,
                format!("{} to {}", from.label(), to.label()),
            ),
            MediaEvent::SourceStopped(source) => {
                (ActivityKind::MediaSource, format!("{} stop", source.label()))
            }
            MediaEvent::MuteChanged(muted) => (
                ActivityKind::MediaToggle,
                if muted { "audio muted" } else { "audio unmuted" }.to_string(),
            ),
            MediaEvent::HideChanged(hidden) => (
                ActivityKind::MediaToggle,
                if hidden { "video hidden" } else { "video shown" }.to_string(),
            ),
        };
        self.activity.record(&self.room_id, kind, value);
    }
}

/// The speaker's entered session.
pub struct SpeakerSession {
    room_id: RoomId,
    user: UserRef,
    snapshots: watch::Receiver<Room>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    watch_task: tokio::task::JoinHandle<()>,
    publisher: PublishingSession,
    slides: SpeakerSlideControl,
    positions: SlidePositionSubscription,
    aggregator: AggregatorHandle,
    chat: ChatService,
    presence: PresenceService,
    room_service: RoomService,
}

impl std::fmt::Debug for SpeakerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeakerSession")
            .field("room_id", &self.room_id)
            .field("user_id", &self.user.id)
            .finish()
    }
}

impl SpeakerSession {
    pub(crate) async fn open(
        c: &SessionCoordinator,
        room: Room,
        user: UserRef,
    ) -> Result<Self> {
        let watch = c.watch_room(&room).await?;
        let positions = match c.positions.subscribe(&room.id).await {
            Ok(positions) => positions,
            Err(e) => {
                watch.task.abort();
                return Err(e.into());
            }
        };

        let sink = Arc::new(ActivityMediaSink {
            room_id: room.id.clone(),
            activity: c.activity.clone(),
        });
        let publisher = PublishingSession::new(
            RelayRoomId::from(room.id.as_str()),
            c.capture.clone(),
            c.connector.clone(),
            c.relay_config(),
            sink,
        );

        let aggregator = c.analysis.spawn_aggregator(
            room.id.clone(),
            Duration::from_secs(c.config.analysis_interval_secs),
        );

        tracing::info!(room_id = %room.id, user_id = %user.id, "Speaker entered");
        Ok(Self {
            slides: c.slide_sync.speaker_control(room.id.clone()),
            room_id: room.id,
            user,
            snapshots: watch.snapshots,
            events: watch.events,
            watch_task: watch.task,
            publisher,
            positions,
            aggregator,
            chat: c.chat.clone(),
            presence: c.presence.clone(),
            room_service: c.room_service.clone(),
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

    /// Wait for the next session event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    // Media. Each call is its own publish attempt; a failure leaves both
    // the source state machine and the document subscription untouched.

    pub async fn start_camera(&self, constraints: CameraConstraints) -> Result<()> {
        Ok(self.publisher.start_camera(constraints).await?)
    }

    pub async fn start_screen(&self, constraints: DisplayConstraints) -> Result<()> {
        Ok(self.publisher.start_screen(constraints).await?)
    }

    /// Stop the active source; the relay room stays joined for the next
    /// publish.
    pub async fn stop_media(&self) {
        self.publisher.stop().await;
    }

    pub async fn set_muted(&self, muted: bool) {
        self.publisher.set_muted(muted).await;
    }

    pub async fn set_hidden(&self, hidden: bool) {
        self.publisher.set_hidden(hidden).await;
    }

    pub async fn active_source(&self) -> Option<MediaSource> {
        self.publisher.active_source().await
    }

    /// The write capability over the authoritative deck state. Only this
    /// session type can hand it out.
    pub fn slides(&self) -> &SpeakerSlideControl {
        &self.slides
    }

    /// Convenience for [`slides`](Self::slides)`.start_deck`.
    pub async fn start_deck(&self, deck: Vec<Slide>) -> Result<()> {
        Ok(self.slides.start_deck(deck).await?)
    }

    pub async fn play_video(&self, video: VideoRef) -> Result<()> {
        Ok(self.slides.play_video(video).await?)
    }

    /// Who is currently browsing independently, and where.
    pub fn listener_positions(&self) -> Vec<SlidePosition> {
        self.positions.current()
    }

    /// The most recent audience-affect aggregate, if any listener has been
    /// sampled yet.
    pub fn latest_analysis(&self) -> Option<EmotionSummary> {
        self.aggregator.latest_summary()
    }

    /// A feed of audience-affect aggregates.
    pub fn analysis_feed(&self) -> watch::Receiver<Option<EmotionSummary>> {
        self.aggregator.summaries()
    }

    pub async fn send_chat(&self, content: &str) -> Result<ChatMessage> {
        Ok(self.chat.send(&self.room_id, &self.user, content).await?)
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    /// Leave the session: stop the background work, release the relay,
    /// remove the speaker from the membership set, and archive the room.
    /// Archival is the broadcast "session over" signal; the room document
    /// and its history survive.
    pub async fn leave(self) -> Result<()> {
        self.aggregator.stop();
        self.watch_task.abort();

        if let Err(e) = self.publisher.leave().await {
            tracing::warn!(error = %e, room_id = %self.room_id, "Failed to leave relay room");
        }

        self.presence.leave(&self.room_id, &self.user.id).await?;
        self.room_service.archive(&self.room_id).await?;
        tracing::info!(room_id = %self.room_id, "Speaker left; room archived");
        Ok(())
        // dropping the session releases the slide-position subscription
    }
}

impl Drop for SpeakerSession {
    fn drop(&mut self) {
        self.aggregator.stop();
        self.watch_task.abort();
    }
}
