pub mod activity;
pub mod analysis;
pub mod chat;
pub mod id;
pub mod presence;
pub mod room;
pub mod slide;
pub mod user;

pub use activity::{ActivityKind, ActivityLogEntry};
pub use analysis::{AnalysisLogEntry, AnalysisSample, EmotionSummary};
pub use chat::ChatMessage;
pub use id::{RoomId, UserId, VideoId};
pub use presence::SlidePosition;
pub use room::Room;
pub use slide::{Slide, VideoRef, VideoSource};
pub use user::UserRef;
