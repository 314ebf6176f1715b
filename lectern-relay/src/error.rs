use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Camera/mic/screen permission denied or device unavailable.
    /// Recoverable: the caller may retry with another device or source.
    #[error("Media acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// The underlying relay could not be joined. The local state machine
    /// keeps its prior state; retry only on explicit caller action.
    #[error("Relay join failed: {0}")]
    JoinFailed(String),

    #[error("Relay join timed out after {0:?}")]
    JoinTimeout(Duration),

    #[error("Not joined to a relay room")]
    NotJoined,

    #[error("Relay session closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, RelayError>;
