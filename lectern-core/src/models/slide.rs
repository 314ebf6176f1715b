use serde::{Deserialize, Serialize};

use super::id::VideoId;

/// Hosting service a slide-embedded video is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoSource {
    Youtube,
    GoogleDrive,
}

impl VideoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "YOUTUBE",
            Self::GoogleDrive => "GOOGLE_DRIVE",
        }
    }
}

/// A video attached to one slide of the deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub id: VideoId,
    pub title: String,
    pub source: VideoSource,
}

impl VideoRef {
    pub fn new(id: VideoId, title: impl Into<String>, source: VideoSource) -> Self {
        Self {
            id,
            title: title.into(),
            source,
        }
    }
}

/// One page of the active deck
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// Rendered page image
    pub url: String,
    /// Videos selectable while this page is shown
    #[serde(default)]
    pub videos: Vec<VideoRef>,
}

impl Slide {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            videos: Vec::new(),
        }
    }

    pub fn with_videos(url: impl Into<String>, videos: Vec<VideoRef>) -> Self {
        Self {
            url: url.into(),
            videos,
        }
    }

    /// Whether `video` is one of this slide's selectable videos
    pub fn has_video(&self, video: &VideoRef) -> bool {
        self.videos.iter().any(|v| v.id == video.id)
    }
}
