use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A participant as embedded in the room membership set.
///
/// Membership is keyed by `id` alone; `name` and `is_listener` are carried
/// for display and are not part of set identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub is_listener: bool,
}

impl UserRef {
    pub fn new(id: UserId, name: impl Into<String>, is_listener: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_listener,
        }
    }

    pub fn speaker(id: UserId, name: impl Into<String>) -> Self {
        Self::new(id, name, false)
    }

    pub fn listener(id: UserId, name: impl Into<String>) -> Self {
        Self::new(id, name, true)
    }
}

impl PartialEq for UserRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UserRef {}
