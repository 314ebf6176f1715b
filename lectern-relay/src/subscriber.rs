//! Listener subscribing session
//!
//! Receive-only relay join with a single displayable slot: every inbound
//! stream replaces the previous one, and a closed room clears the slot.
//! There is no multi-stream compositing; the one speaker's stream is the
//! only thing a listener displays.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::session::{JoinMode, RelayConnector, RelayEvent, RelayRoom};
use crate::track::MediaStream;
use crate::types::{PeerId, RelayRoomId};

/// The inbound stream currently occupying the display slot
#[derive(Debug, Clone)]
pub struct RemoteStream {
    /// The publishing peer
    pub peer_id: PeerId,
    pub stream: MediaStream,
}

/// The listener's half of the relay: joined receive-only, exposing whatever
/// the speaker currently publishes through a single watch slot.
pub struct SubscribingSession {
    room: Arc<dyn RelayRoom>,
    slot: watch::Receiver<Option<RemoteStream>>,
    pump: tokio::task::JoinHandle<()>,
}

impl SubscribingSession {
    /// Join `room_id` receive-only. Join failure or timeout leaves nothing
    /// behind; retry is an explicit caller action.
    pub async fn join(
        room_id: RelayRoomId,
        connector: Arc<dyn RelayConnector>,
        config: &RelayConfig,
    ) -> Result<Self> {
        let timeout = config.join_timeout();
        let join = connector.join(room_id.clone(), JoinMode::Subscribe);
        let room = match tokio::time::timeout(timeout, join).await {
            Err(_) => return Err(RelayError::JoinTimeout(timeout)),
            Ok(room) => room?,
        };

        let mut events = room
            .take_events()
            .ok_or_else(|| RelayError::JoinFailed("relay event feed already taken".to_string()))?;
        let (slot_tx, slot_rx) = watch::channel(None);

        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    RelayEvent::Stream { peer_id, stream } => {
                        debug!(peer_id = %peer_id, stream_id = stream.id(), "Inbound stream");
                        slot_tx.send_replace(Some(RemoteStream { peer_id, stream }));
                    }
                    // Observational only: the room document is the
                    // authoritative presence signal.
                    RelayEvent::PeerJoin(peer_id) => {
                        debug!(peer_id = %peer_id, "Relay peer joined");
                    }
                    RelayEvent::PeerLeave(peer_id) => {
                        debug!(peer_id = %peer_id, "Relay peer left");
                    }
                    RelayEvent::Closed => {
                        slot_tx.send_replace(None);
                        break;
                    }
                }
            }
        });

        info!(room_id = %room_id, "Joined relay receive-only");
        Ok(Self {
            room,
            slot: slot_rx,
            pump,
        })
    }

    /// The stream currently occupying the display slot.
    pub fn current_stream(&self) -> Option<RemoteStream> {
        self.slot.borrow().clone()
    }

    /// A feed of slot changes for the display layer.
    pub fn streams(&self) -> watch::Receiver<Option<RemoteStream>> {
        self.slot.clone()
    }

    /// Leave the relay room and stop the event pump.
    pub async fn leave(&self) -> Result<()> {
        self.pump.abort();
        self.room.leave().await
    }
}

impl Drop for SubscribingSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

impl std::fmt::Debug for SubscribingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscribingSession")
            .field("occupied", &self.slot.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRelayConnector, RelayCall};
    use crate::track::{MediaTrack, TrackKind};

    fn video_stream() -> MediaStream {
        MediaStream::new(vec![MediaTrack::new(TrackKind::Video)])
    }

    async fn drain_tasks() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_join_is_receive_only() {
        let connector = Arc::new(FakeRelayConnector::new());
        let session = SubscribingSession::join(
            RelayRoomId::from("room1"),
            connector.clone(),
            &RelayConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(connector.calls(), vec![RelayCall::JoinSubscribe]);
        assert!(session.current_stream().is_none());
    }

    #[tokio::test]
    async fn test_new_inbound_stream_replaces_previous() {
        let connector = Arc::new(FakeRelayConnector::new());
        let session = SubscribingSession::join(
            RelayRoomId::from("room1"),
            connector.clone(),
            &RelayConfig::default(),
        )
        .await
        .unwrap();
        let room = connector.last_room();

        let first = video_stream();
        room.push_stream(PeerId::from("speaker"), first.clone());
        drain_tasks().await;
        assert_eq!(
            session.current_stream().unwrap().stream.id(),
            first.id()
        );

        // Single slot: the second stream displaces the first.
        let second = video_stream();
        room.push_stream(PeerId::from("speaker"), second.clone());
        drain_tasks().await;
        let current = session.current_stream().unwrap();
        assert_eq!(current.stream.id(), second.id());
        assert_eq!(current.peer_id, PeerId::from("speaker"));
    }

    #[tokio::test]
    async fn test_closed_room_clears_slot() {
        let connector = Arc::new(FakeRelayConnector::new());
        let session = SubscribingSession::join(
            RelayRoomId::from("room1"),
            connector.clone(),
            &RelayConfig::default(),
        )
        .await
        .unwrap();
        let room = connector.last_room();

        room.push_stream(PeerId::from("speaker"), video_stream());
        drain_tasks().await;
        assert!(session.current_stream().is_some());

        room.close();
        drain_tasks().await;
        assert!(session.current_stream().is_none());
    }

    #[tokio::test]
    async fn test_presence_events_do_not_touch_the_slot() {
        let connector = Arc::new(FakeRelayConnector::new());
        let session = SubscribingSession::join(
            RelayRoomId::from("room1"),
            connector.clone(),
            &RelayConfig::default(),
        )
        .await
        .unwrap();
        let room = connector.last_room();

        room.push_stream(PeerId::from("speaker"), video_stream());
        drain_tasks().await;

        room.push_peer_join(PeerId::from("other"));
        room.push_peer_leave(PeerId::from("other"));
        drain_tasks().await;
        assert!(session.current_stream().is_some());
    }

    #[tokio::test]
    async fn test_join_failure_propagates() {
        let connector = Arc::new(FakeRelayConnector::new());
        connector.deny_join(true);

        let err = SubscribingSession::join(
            RelayRoomId::from("room1"),
            connector,
            &RelayConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RelayError::JoinFailed(_)));
    }

    #[tokio::test]
    async fn test_leave_releases_the_room() {
        let connector = Arc::new(FakeRelayConnector::new());
        let session = SubscribingSession::join(
            RelayRoomId::from("room1"),
            connector.clone(),
            &RelayConfig::default(),
        )
        .await
        .unwrap();

        session.leave().await.unwrap();
        assert!(connector.calls().contains(&RelayCall::Leave));
    }
}
