pub mod activity;
pub mod analysis;
pub mod chat;
pub mod presence;
pub mod room;
pub mod slide_sync;

pub use activity::ActivityLogService;
pub use analysis::{AggregatorHandle, AnalysisService};
pub use chat::ChatService;
pub use presence::{CleanupReport, PresenceService};
pub use room::RoomService;
pub use slide_sync::{SlideFollower, SlideSyncService, SpeakerSlideControl, SyncState};
