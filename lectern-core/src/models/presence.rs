use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A listener's slide-following state, one document per listener while the
/// slide view is open.
///
/// Absence of the document is equivalent to `is_sync = true, position = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidePosition {
    /// Keyed by listener id
    pub id: UserId,
    pub is_sync: bool,
    /// Independent page index; meaningful only when `is_sync == false`
    pub position: Option<usize>,
}

impl SlidePosition {
    /// Following the speaker
    pub fn synced(id: UserId) -> Self {
        Self {
            id,
            is_sync: true,
            position: None,
        }
    }

    /// Browsing independently at `position`
    pub fn desynced(id: UserId, position: usize) -> Self {
        Self {
            id,
            is_sync: false,
            position: Some(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synced_carries_no_position() {
        let pos = SlidePosition::synced(UserId::from("u1"));
        assert!(pos.is_sync);
        assert!(pos.position.is_none());
    }

    #[test]
    fn test_desynced_records_position() {
        let pos = SlidePosition::desynced(UserId::from("u1"), 3);
        assert!(!pos.is_sync);
        assert_eq!(pos.position, Some(3));
    }
}
