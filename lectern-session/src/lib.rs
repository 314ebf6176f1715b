//! Lectern session coordinator
//!
//! The coordination layer over the document store, the relay transport and
//! the capture devices: entering a live lecture, keeping every participant
//! consistent while it runs, and tearing it down so that the end of the
//! session is observed by everyone.
//!
//! ## Architecture
//!
//! - **`SessionCoordinator`**: wires the stores and external services and
//!   resolves entry (room lookup, entry secret, speaker authorization)
//! - **`SpeakerSession`**: the publishing role — outbound media source,
//!   authoritative deck control, audience overview, analysis aggregation;
//!   departure archives the room
//! - **`ListenerSession`**: the subscribing role — the displayable remote
//!   stream, the sync/desync slide overlay; departure deletes the
//!   listener's per-room documents best-effort
//!
//! Role dispatch happens exactly once, at entry: operations only one role
//! may perform exist only on that role's session type.

mod coordinator;
mod error;
mod listener;
mod speaker;

#[cfg(test)]
mod testutil;

pub use coordinator::{
    EntryRequest, PeerRole, Session, SessionCoordinator, SessionEvent,
};
pub use error::{Result, SessionError};
pub use listener::ListenerSession;
pub use speaker::SpeakerSession;
