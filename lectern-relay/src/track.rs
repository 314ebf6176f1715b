//! Mutable media stream model
//!
//! Mirrors the capture device contract: a stream is a bag of tracks whose
//! `enabled` flag toggles in place (disabling never removes a track — that
//! would force renegotiation on the relay) and whose hardware is released
//! by an irreversible `stop`. Display-capture video tracks additionally
//! deliver an `ended` notification when the user stops sharing through the
//! OS chrome rather than the application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nanoid::nanoid;
use parking_lot::Mutex;
use tracing::debug;

/// Kind of media a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

type EndedHandler = Box<dyn Fn() + Send + Sync>;

struct TrackInner {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
    /// Fired once, on source-side end (OS-level stop of a screen share)
    ended_handlers: Mutex<Vec<EndedHandler>>,
}

/// One audio or video track. Cheaply cloneable; clones share state, as all
/// holders observe the same underlying device.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    #[must_use]
    pub fn new(kind: TrackKind) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: nanoid!(12),
                kind,
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                ended_handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Toggle the track in place. The track stays in its stream; only
    /// `enabled` changes.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Release the underlying hardware. Irreversible; does not fire the
    /// `ended` notification (that is reserved for source-side ends).
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            debug!(track_id = %self.inner.id, kind = ?self.inner.kind, "Track stopped");
        }
    }

    /// Register a handler for the source-side `ended` notification.
    pub fn on_ended(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.inner.ended_handlers.lock().push(Box::new(handler));
    }

    /// Signal that the source ended outside the application (e.g. the user
    /// stopped the screen share through the OS chrome). Marks the track
    /// stopped and fires the registered handlers once.
    pub fn end_from_source(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(track_id = %self.inner.id, kind = ?self.inner.kind, "Track ended by source");
        let handlers = std::mem::take(&mut *self.inner.ended_handlers.lock());
        for handler in handlers {
            handler();
        }
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// A bag of tracks published or received as one unit.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    #[must_use]
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: nanoid!(12),
            tracks,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    /// Toggle every audio track in place.
    pub fn set_audio_enabled(&self, enabled: bool) {
        for track in self.audio_tracks() {
            track.set_enabled(enabled);
        }
    }

    /// Toggle every video track in place.
    pub fn set_video_enabled(&self, enabled: bool) {
        for track in self.video_tracks() {
            track.set_enabled(enabled);
        }
    }

    /// Release all underlying hardware.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Whether any track still holds its hardware.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_stopped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn camera_like() -> MediaStream {
        MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video),
            MediaTrack::new(TrackKind::Audio),
        ])
    }

    #[test]
    fn test_disable_keeps_track_in_stream() {
        let stream = camera_like();
        stream.set_audio_enabled(false);

        assert_eq!(stream.tracks().len(), 2);
        assert!(stream.audio_tracks().all(|t| !t.is_enabled()));
        assert!(stream.video_tracks().all(MediaTrack::is_enabled));
        assert!(stream.is_live());
    }

    #[test]
    fn test_stop_all_releases_every_track() {
        let stream = camera_like();
        stream.stop_all();
        assert!(!stream.is_live());
        assert!(stream.tracks().iter().all(MediaTrack::is_stopped));
    }

    #[test]
    fn test_ended_fires_handlers_once() {
        let track = MediaTrack::new(TrackKind::Video);
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        track.on_ended(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        track.end_from_source();
        track.end_from_source();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(track.is_stopped());
    }

    #[test]
    fn test_app_stop_does_not_fire_ended() {
        let track = MediaTrack::new(TrackKind::Video);
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        track.on_ended(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        track.stop();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        // A later source end on an already-stopped track stays silent.
        track.end_from_source();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let track = MediaTrack::new(TrackKind::Audio);
        let clone = track.clone();
        clone.set_enabled(false);
        assert!(!track.is_enabled());
    }
}
