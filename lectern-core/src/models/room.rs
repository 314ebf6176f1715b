use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};
use super::slide::{Slide, VideoRef};
use super::user::UserRef;

/// The root aggregate for one live lecture session.
///
/// Writer sets are disjoint by protocol: `current_page`, `playing_video`,
/// `slides` and `is_archived` are written only through the speaker's
/// capability handles; `users` is mutated only through the store's atomic
/// set operations, never by positional replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub admin_id: UserId,
    /// Admin display name, denormalized for listing
    pub admin: String,
    /// Shared entry secret, compared verbatim on entry
    pub password: String,
    /// Terminal flag: set once on speaker departure, never reverted
    pub is_archived: bool,
    /// Membership set, duplicate-free by user id
    pub users: Vec<UserRef>,
    /// Active deck; `None` means no deck is shown
    #[serde(default)]
    pub slides: Option<Vec<Slide>>,
    /// Authoritative page index; meaningful only while `slides` is present
    #[serde(default)]
    pub current_page: Option<usize>,
    /// Authoritative "show this video instead of the slide image" override
    #[serde(default)]
    pub playing_video: Option<VideoRef>,
    /// High-water mark of concurrently analyzed listeners
    #[serde(default)]
    pub max_attendees: usize,
    pub timestamp: DateTime<Utc>,
}

impl Room {
    pub fn new(
        name: impl Into<String>,
        admin: &UserRef,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            admin_id: admin.id.clone(),
            admin: admin.name.clone(),
            password: password.into(),
            is_archived: false,
            users: vec![admin.clone()],
            slides: None,
            current_page: None,
            playing_video: None,
            max_attendees: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.admin_id == *user_id
    }

    pub fn contains_user(&self, user_id: &UserId) -> bool {
        self.users.iter().any(|u| u.id == *user_id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of deck pages, 0 when no deck is active
    pub fn page_count(&self) -> usize {
        self.slides.as_ref().map_or(0, Vec::len)
    }

    /// The slide currently shown by the speaker, when a deck is active
    pub fn current_slide(&self) -> Option<&Slide> {
        let slides = self.slides.as_deref()?;
        slides.get(self.current_page?)
    }
}
