//! Speaker publishing session
//!
//! One outbound media source at a time: `Idle` until the first device
//! acquisition succeeds, then `Publishing(Camera)` or `Publishing(Screen)`.
//! The relay room is joined once, on the first publish; every later source
//! change swaps the outbound stream in place so the listener-visible peer
//! identity never churns. Old hardware is released only after the swap has
//! been issued, so the relay never observes an intermediate `Idle`.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::capture::{CameraConstraints, DisplayConstraints, MediaCapture};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::session::{JoinMode, RelayConnector, RelayRoom};
use crate::track::MediaStream;
use crate::types::RelayRoomId;

/// The speaker's outbound source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    Camera,
    Screen,
}

impl MediaSource {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Screen => "screen",
        }
    }
}

/// A source or toggle transition, reported as it happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    SourceStarted(MediaSource),
    SourceSwitched { from: MediaSource, to: MediaSource },
    SourceStopped(MediaSource),
    MuteChanged(bool),
    HideChanged(bool),
}

/// Receives every media transition, fire-and-forget.
///
/// Implementations must return promptly and never fail the transition that
/// produced the event; anything slow (an audit-log append) belongs on a
/// detached task inside the sink.
pub trait MediaEventSink: Send + Sync {
    fn emit(&self, event: MediaEvent);
}

struct PublisherState {
    /// Joined on the first publish and kept open across source changes and
    /// stops; only `leave` releases it.
    room: Option<Arc<dyn RelayRoom>>,
    publishing: Option<(MediaSource, MediaStream)>,
    muted: bool,
    hidden: bool,
}

struct PublisherInner {
    room_id: RelayRoomId,
    capture: Arc<dyn MediaCapture>,
    connector: Arc<dyn RelayConnector>,
    config: RelayConfig,
    sink: Arc<dyn MediaEventSink>,
    state: Mutex<PublisherState>,
    /// Source-side ends (OS-chrome stop of a screen share) funnel through
    /// here, keyed by stream id, and are handled like an explicit stop.
    ended_tx: mpsc::UnboundedSender<String>,
}

/// The speaker's half of the relay: publishes exactly one outbound source
/// and switches it without leaving the room.
///
/// Cheaply cloneable; clones share the session.
#[derive(Clone)]
pub struct PublishingSession {
    inner: Arc<PublisherInner>,
}

impl PublishingSession {
    pub fn new(
        room_id: RelayRoomId,
        capture: Arc<dyn MediaCapture>,
        connector: Arc<dyn RelayConnector>,
        config: RelayConfig,
        sink: Arc<dyn MediaEventSink>,
    ) -> Self {
        let (ended_tx, mut ended_rx) = mpsc::unbounded_channel::<String>();
        let inner = Arc::new(PublisherInner {
            room_id,
            capture,
            connector,
            config,
            sink,
            state: Mutex::new(PublisherState {
                room: None,
                publishing: None,
                muted: false,
                hidden: false,
            }),
            ended_tx,
        });

        // The watcher holds only a weak handle: dropping the last session
        // clone closes the channel and ends the task.
        let weak: Weak<PublisherInner> = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(stream_id) = ended_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.stop_stream(Some(&stream_id)).await;
            }
        });

        Self { inner }
    }

    /// Acquire the camera (and microphone) and make it the outbound source.
    ///
    /// Acquisition rejection surfaces as `AcquisitionFailed` and leaves the
    /// state machine untouched; a failed join or swap releases the freshly
    /// acquired hardware and also leaves the prior state in place.
    pub async fn start_camera(&self, constraints: CameraConstraints) -> Result<()> {
        let stream = self.inner.capture.acquire_camera(constraints).await?;
        self.inner.publish(MediaSource::Camera, stream).await
    }

    /// Acquire a display capture and make it the outbound source.
    ///
    /// The user stopping the share through the OS chrome is handled exactly
    /// like calling [`stop`](Self::stop).
    pub async fn start_screen(&self, constraints: DisplayConstraints) -> Result<()> {
        let stream = self.inner.capture.acquire_display(constraints).await?;
        for track in stream.video_tracks() {
            let tx = self.inner.ended_tx.clone();
            let stream_id = stream.id().to_string();
            track.on_ended(move || {
                let _ = tx.send(stream_id.clone());
            });
        }
        self.inner.publish(MediaSource::Screen, stream).await
    }

    /// Stop the active source with no successor: all of its tracks are
    /// released and the machine returns to `Idle`. The relay room stays
    /// joined. No-op when nothing is published.
    pub async fn stop(&self) {
        self.inner.stop_stream(None).await;
    }

    /// Toggle the published audio in place. The tracks stay in the stream;
    /// only `enabled` changes, so no renegotiation happens. A no-op when
    /// nothing is published yet.
    pub async fn set_muted(&self, muted: bool) {
        let mut state = self.inner.state.lock().await;
        let Some((_, stream)) = &state.publishing else {
            return;
        };
        stream.set_audio_enabled(!muted);
        state.muted = muted;
        self.inner.sink.emit(MediaEvent::MuteChanged(muted));
    }

    /// Toggle the published video in place. Same contract as
    /// [`set_muted`](Self::set_muted).
    pub async fn set_hidden(&self, hidden: bool) {
        let mut state = self.inner.state.lock().await;
        let Some((_, stream)) = &state.publishing else {
            return;
        };
        stream.set_video_enabled(!hidden);
        state.hidden = hidden;
        self.inner.sink.emit(MediaEvent::HideChanged(hidden));
    }

    pub async fn active_source(&self) -> Option<MediaSource> {
        self.inner.state.lock().await.publishing.as_ref().map(|(s, _)| *s)
    }

    pub async fn is_publishing(&self) -> bool {
        self.inner.state.lock().await.publishing.is_some()
    }

    pub async fn is_muted(&self) -> bool {
        self.inner.state.lock().await.muted
    }

    pub async fn is_hidden(&self) -> bool {
        self.inner.state.lock().await.hidden
    }

    /// Tear the session down: stop whatever is published and leave the
    /// relay room.
    pub async fn leave(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if let Some((source, stream)) = state.publishing.take() {
            stream.stop_all();
            self.inner.sink.emit(MediaEvent::SourceStopped(source));
        }
        if let Some(room) = state.room.take() {
            room.leave().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PublishingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishingSession")
            .field("room_id", &self.inner.room_id)
            .finish()
    }
}

impl PublisherInner {
    /// Make `stream` the outbound source: first publish joins the relay,
    /// every later publish swaps the stream on the open room.
    async fn publish(&self, source: MediaSource, stream: MediaStream) -> Result<()> {
        let mut state = self.state.lock().await;

        // Surviving mute/hide toggles apply before the stream is visible.
        stream.set_audio_enabled(!state.muted);
        stream.set_video_enabled(!state.hidden);

        let outcome = match state.room.clone() {
            None => self.join(&mut state, stream.clone()).await,
            Some(room) => room.replace_stream(stream.clone()).await,
        };
        if let Err(e) = outcome {
            // The prior state stays in place; release what we just acquired.
            stream.stop_all();
            warn!(
                error = %e,
                room_id = %self.room_id,
                source = source.label(),
                "Publish failed"
            );
            return Err(e);
        }

        let prior = state.publishing.replace((source, stream));
        match prior {
            Some((old_source, old_stream)) => {
                // The swap has been issued; only now is the old hardware
                // released, so no gap is observable on the relay.
                old_stream.stop_all();
                if old_source == source {
                    self.sink.emit(MediaEvent::SourceStarted(source));
                } else {
                    info!(
                        room_id = %self.room_id,
                        from = old_source.label(),
                        to = source.label(),
                        "Outbound source switched"
                    );
                    self.sink.emit(MediaEvent::SourceSwitched {
                        from: old_source,
                        to: source,
                    });
                }
            }
            None => {
                info!(
                    room_id = %self.room_id,
                    source = source.label(),
                    "Outbound source started"
                );
                self.sink.emit(MediaEvent::SourceStarted(source));
            }
        }
        Ok(())
    }

    async fn join(&self, state: &mut PublisherState, stream: MediaStream) -> Result<()> {
        let timeout = self.config.join_timeout();
        let join = self
            .connector
            .join(self.room_id.clone(), JoinMode::Publish(stream));
        match tokio::time::timeout(timeout, join).await {
            Err(_) => Err(RelayError::JoinTimeout(timeout)),
            Ok(Err(e)) => Err(e),
            Ok(Ok(room)) => {
                state.room = Some(room);
                Ok(())
            }
        }
    }

    /// Stop the active source. With `only_stream` set, acts only when that
    /// stream is still the published one (stale source-side ends of an
    /// already-replaced capture are ignored).
    async fn stop_stream(&self, only_stream: Option<&str>) {
        let mut state = self.state.lock().await;
        let Some((source, stream)) = state.publishing.take() else {
            return;
        };
        if let Some(id) = only_stream {
            if stream.id() != id {
                state.publishing = Some((source, stream));
                return;
            }
            debug!(
                room_id = %self.room_id,
                source = source.label(),
                "Source ended outside the application"
            );
        }
        stream.stop_all();
        info!(
            room_id = %self.room_id,
            source = source.label(),
            "Outbound source stopped"
        );
        self.sink.emit(MediaEvent::SourceStopped(source));
    }
}
