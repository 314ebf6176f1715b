//! Media capture contract
//!
//! The device layer is external; this is the seam the coordinator consumes
//! it through. Acquisition is asynchronous (permission prompts, device
//! spin-up) and rejection maps to `AcquisitionFailed` without touching any
//! session state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::track::MediaStream;

/// Constraints for camera + microphone acquisition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraConstraints {
    /// Specific camera to open; `None` lets the device layer pick
    pub device_id: Option<String>,
    /// Capture the microphone alongside the camera
    pub audio: bool,
}

impl CameraConstraints {
    #[must_use]
    pub fn with_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            audio: true,
        }
    }
}

/// Constraints for display (screen share) acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConstraints {
    pub width: u32,
    pub height: u32,
    /// Capture system audio with the screen
    pub audio: bool,
}

impl Default for DisplayConstraints {
    fn default() -> Self {
        Self {
            width: 3840,
            height: 2160,
            audio: true,
        }
    }
}

/// The capture device service.
///
/// Returned streams are mutable: tracks can be individually toggled or
/// stopped, and display-capture video tracks fire `ended` when the user
/// stops sharing through the OS chrome.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire_camera(&self, constraints: CameraConstraints) -> Result<MediaStream>;

    async fn acquire_display(&self, constraints: DisplayConstraints) -> Result<MediaStream>;
}
