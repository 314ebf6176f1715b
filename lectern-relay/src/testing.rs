//! Test doubles for the capture and relay contracts
//!
//! Hand-written fakes shared by this crate's unit tests and by downstream
//! session tests: a capture service that can deny access, a relay connector
//! that records its call order and can fail, hang or close on demand, and a
//! sink that records every media event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::capture::{CameraConstraints, DisplayConstraints, MediaCapture};
use crate::error::{RelayError, Result};
use crate::publisher::{MediaEvent, MediaEventSink};
use crate::session::{JoinMode, RelayConnector, RelayEvent, RelayRoom};
use crate::track::{MediaStream, MediaTrack, TrackKind};
use crate::types::{PeerId, RelayRoomId};

/// Capture service fake. Acquisition can be denied to simulate a rejected
/// permission prompt; every handed-out stream is retained for assertions on
/// hardware release.
#[derive(Default)]
pub struct FakeCapture {
    deny: AtomicBool,
    acquired: Mutex<Vec<MediaStream>>,
}

impl FakeCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following acquisition fail, as a denied permission prompt
    /// would.
    pub fn deny_access(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Every stream handed out so far, in acquisition order.
    pub fn acquired(&self) -> Vec<MediaStream> {
        self.acquired.lock().clone()
    }

    fn hand_out(&self, tracks: Vec<MediaTrack>) -> Result<MediaStream> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(RelayError::AcquisitionFailed(
                "permission denied".to_string(),
            ));
        }
        let stream = MediaStream::new(tracks);
        self.acquired.lock().push(stream.clone());
        Ok(stream)
    }
}

#[async_trait]
impl MediaCapture for FakeCapture {
    async fn acquire_camera(&self, constraints: CameraConstraints) -> Result<MediaStream> {
        let mut tracks = vec![MediaTrack::new(TrackKind::Video)];
        if constraints.audio {
            tracks.push(MediaTrack::new(TrackKind::Audio));
        }
        self.hand_out(tracks)
    }

    async fn acquire_display(&self, constraints: DisplayConstraints) -> Result<MediaStream> {
        let mut tracks = vec![MediaTrack::new(TrackKind::Video)];
        if constraints.audio {
            tracks.push(MediaTrack::new(TrackKind::Audio));
        }
        self.hand_out(tracks)
    }
}

/// One observed call on the fake relay, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCall {
    JoinPublish,
    JoinSubscribe,
    /// `prior_was_live` captures whether the previously published stream
    /// still held its hardware at the moment of the swap; the
    /// replace-before-stop property is asserted through it.
    Replace {
        prior_was_live: bool,
    },
    Leave,
}

/// Relay room fake sharing its call log with the connector that created it.
pub struct FakeRelayRoom {
    calls: Arc<Mutex<Vec<RelayCall>>>,
    published: Mutex<Option<MediaStream>>,
    deny_replace: AtomicBool,
    events_tx: mpsc::UnboundedSender<RelayEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<RelayEvent>>>,
}

impl FakeRelayRoom {
    fn new(calls: Arc<Mutex<Vec<RelayCall>>>, published: Option<MediaStream>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            calls,
            published: Mutex::new(published),
            deny_replace: AtomicBool::new(false),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// The outbound stream the relay currently holds, if any.
    pub fn published_stream(&self) -> Option<MediaStream> {
        self.published.lock().clone()
    }

    /// Make every following `replace_stream` fail.
    pub fn deny_replace(&self, deny: bool) {
        self.deny_replace.store(deny, Ordering::SeqCst);
    }

    /// Deliver an inbound stream to the joined subscriber.
    pub fn push_stream(&self, peer_id: PeerId, stream: MediaStream) {
        let _ = self.events_tx.send(RelayEvent::Stream { peer_id, stream });
    }

    pub fn push_peer_join(&self, peer_id: PeerId) {
        let _ = self.events_tx.send(RelayEvent::PeerJoin(peer_id));
    }

    pub fn push_peer_leave(&self, peer_id: PeerId) {
        let _ = self.events_tx.send(RelayEvent::PeerLeave(peer_id));
    }

    /// Close the room underneath the participant.
    pub fn close(&self) {
        let _ = self.events_tx.send(RelayEvent::Closed);
    }
}

#[async_trait]
impl RelayRoom for FakeRelayRoom {
    async fn replace_stream(&self, stream: MediaStream) -> Result<()> {
        let mut published = self.published.lock();
        let prior_was_live = published.as_ref().is_some_and(MediaStream::is_live);
        self.calls.lock().push(RelayCall::Replace { prior_was_live });
        if self.deny_replace.load(Ordering::SeqCst) {
            return Err(RelayError::Closed);
        }
        *published = Some(stream);
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<RelayEvent>> {
        self.events_rx.lock().take()
    }

    async fn leave(&self) -> Result<()> {
        self.calls.lock().push(RelayCall::Leave);
        Ok(())
    }
}

/// Relay connector fake. Joins can be denied or hung; every created room
/// shares the connector's call log.
#[derive(Default)]
pub struct FakeRelayConnector {
    calls: Arc<Mutex<Vec<RelayCall>>>,
    rooms: Mutex<Vec<Arc<FakeRelayRoom>>>,
    deny_join: AtomicBool,
    hang_join: AtomicBool,
}

impl FakeRelayConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following join fail, as an unreachable relay would.
    pub fn deny_join(&self, deny: bool) {
        self.deny_join.store(deny, Ordering::SeqCst);
    }

    /// Make every following join hang forever, for timeout tests.
    pub fn hang_join(&self, hang: bool) {
        self.hang_join.store(hang, Ordering::SeqCst);
    }

    /// Every call observed so far across the connector and its rooms.
    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().clone()
    }

    /// The most recently joined room.
    ///
    /// # Panics
    /// Panics when nothing has joined yet.
    #[must_use]
    pub fn last_room(&self) -> Arc<FakeRelayRoom> {
        self.rooms
            .lock()
            .last()
            .expect("no relay room joined yet")
            .clone()
    }
}

#[async_trait]
impl RelayConnector for FakeRelayConnector {
    async fn join(&self, _room: RelayRoomId, mode: JoinMode) -> Result<Arc<dyn RelayRoom>> {
        if self.hang_join.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.deny_join.load(Ordering::SeqCst) {
            return Err(RelayError::JoinFailed("relay unreachable".to_string()));
        }

        let (call, published) = match mode {
            JoinMode::Publish(stream) => (RelayCall::JoinPublish, Some(stream)),
            JoinMode::Subscribe => (RelayCall::JoinSubscribe, None),
        };
        self.calls.lock().push(call);

        let room = Arc::new(FakeRelayRoom::new(self.calls.clone(), published));
        self.rooms.lock().push(room.clone());
        Ok(room)
    }
}

/// Sink that records every emitted media event, in order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MediaEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().clone()
    }
}

impl MediaEventSink for RecordingSink {
    fn emit(&self, event: MediaEvent) {
        self.events.lock().push(event);
    }
}
