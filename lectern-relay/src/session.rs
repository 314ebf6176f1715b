//! Relay session contract
//!
//! The SFU transport is opaque; this is the contract the coordinator
//! requires from it: join a room (publishing or receive-only), replace the
//! outbound stream without leaving, receive inbound streams and presence
//! events, leave. Presence events are observational only — the
//! authoritative presence signal is the room document, not the relay.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::track::MediaStream;
use crate::types::{PeerId, RelayRoomId};

/// How the local participant joins a relay room
#[derive(Debug, Clone)]
pub enum JoinMode {
    /// Publish the given outbound stream
    Publish(MediaStream),
    /// Receive-only
    Subscribe,
}

/// Events delivered by a joined relay room
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// An inbound remote stream, keyed by the publishing peer
    Stream {
        peer_id: PeerId,
        stream: MediaStream,
    },
    /// A peer joined (observational only)
    PeerJoin(PeerId),
    /// A peer left (observational only)
    PeerLeave(PeerId),
    /// The room was closed underneath us
    Closed,
}

/// A joined relay room.
#[async_trait]
pub trait RelayRoom: Send + Sync {
    /// Swap the outbound stream in place. The session stays open, so the
    /// listener-visible peer identity is stable across the swap.
    async fn replace_stream(&self, stream: MediaStream) -> Result<()>;

    /// Take the event feed. Yields `None` after the first call; one
    /// consumer owns the feed.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<RelayEvent>>;

    async fn leave(&self) -> Result<()>;
}

/// The relay transport entry point.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    async fn join(&self, room: RelayRoomId, mode: JoinMode) -> Result<Arc<dyn RelayRoom>>;
}
