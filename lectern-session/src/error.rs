use lectern_core::models::{RoomId, UserId};
use lectern_relay::RelayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The session id does not resolve to a room. Fatal to the entry
    /// attempt; the caller must not retry blindly.
    #[error("Room {0} not found")]
    NotFound(RoomId),

    /// The room was archived before entry; archived sessions cannot be
    /// joined.
    #[error("Room {0} is archived")]
    Archived(RoomId),

    #[error("Wrong password")]
    WrongPassword,

    /// Speaker-role entry by anyone but the room's admin.
    #[error("User {user_id} is not the admin of room {room_id}")]
    NotAdmin { room_id: RoomId, user_id: UserId },

    /// Camera/mic/screen permission denied or device unavailable.
    /// Recoverable: retry with a different device or source.
    #[error("Media acquisition failed: {0}")]
    MediaAcquisitionFailed(String),

    /// The relay could not be joined; prior session state is intact and
    /// retry is an explicit caller action.
    #[error("Relay join failed: {0}")]
    RelayJoinFailed(String),

    /// One of the best-effort leave-time deletions failed. Non-fatal: the
    /// participant has left regardless; the carried messages say what was
    /// left behind.
    #[error("Leave-time cleanup partially failed")]
    CleanupPartialFailure {
        analysis: Option<String>,
        slide_position: Option<String>,
    },

    #[error(transparent)]
    Core(lectern_core::Error),

    #[error(transparent)]
    Relay(RelayError),
}

impl From<lectern_core::Error> for SessionError {
    fn from(e: lectern_core::Error) -> Self {
        match e {
            lectern_core::Error::WrongPassword => Self::WrongPassword,
            other => Self::Core(other),
        }
    }
}

impl From<RelayError> for SessionError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::AcquisitionFailed(msg) => Self::MediaAcquisitionFailed(msg),
            RelayError::JoinFailed(msg) => Self::RelayJoinFailed(msg),
            e @ RelayError::JoinTimeout(_) => Self::RelayJoinFailed(e.to_string()),
            other => Self::Relay(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
