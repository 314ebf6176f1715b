use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{generate_id, UserId};

/// What produced an activity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Speaker deck control: start/stop and authoritative page moves
    SpeakerSlide,
    /// A listener's independent navigation and (un)sync actions
    ListenerSlide { user_id: UserId },
    /// Outbound media source start/stop (camera, screen)
    MediaSource,
    /// Mute/hide toggles on the published tracks
    MediaToggle,
}

impl ActivityKind {
    pub fn label(&self) -> String {
        match self {
            Self::SpeakerSlide => "speaker_slide".to_string(),
            Self::ListenerSlide { user_id } => format!("{user_id}_slide"),
            Self::MediaSource => "media_source".to_string(),
            Self::MediaToggle => "media_toggle".to_string(),
        }
    }
}

/// One audit record in a room's activity log.
///
/// Appended fire-and-forget: the state transition that produced it never
/// waits on the append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn new(kind: ActivityKind, value: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            kind,
            value: value.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(ActivityKind::SpeakerSlide.label(), "speaker_slide");
        let kind = ActivityKind::ListenerSlide {
            user_id: UserId::from("u1"),
        };
        assert_eq!(kind.label(), "u1_slide");
    }
}
