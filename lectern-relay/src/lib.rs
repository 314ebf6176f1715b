//! Lectern relay layer
//!
//! Binds a participant to the SFU-style relay appropriate to its role and
//! manages the speaker's single outbound media source.
//!
//! ## Architecture
//!
//! - **`PublishingSession`**: the speaker's half — acquires camera/screen,
//!   joins the relay on first publish, and switches sources by replacing
//!   the outbound stream without ever leaving the relay room
//! - **`SubscribingSession`**: the listener's half — receive-only join with
//!   a single displayable remote stream slot
//! - **`MediaCapture`** / **`RelayConnector`**: the contracts the external
//!   capture and transport services are consumed through
//! - **`MediaStream`** / **`MediaTrack`**: the mutable stream model; tracks
//!   toggle in place and stop irreversibly
//!
//! The relay transport's internals (negotiation, forwarding) are out of
//! scope here; everything behind `RelayConnector` is opaque.

mod capture;
mod config;
mod error;
mod publisher;
mod session;
mod subscriber;
mod track;
mod types;

pub mod testing;

pub use capture::{CameraConstraints, DisplayConstraints, MediaCapture};
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use publisher::{MediaEvent, MediaEventSink, MediaSource, PublishingSession};
pub use session::{JoinMode, RelayConnector, RelayEvent, RelayRoom};
pub use subscriber::{RemoteStream, SubscribingSession};
pub use track::{MediaStream, MediaTrack, TrackKind};
pub use types::{PeerId, RelayRoomId};
