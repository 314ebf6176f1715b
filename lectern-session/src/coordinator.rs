//! Session entry and role dispatch
//!
//! One coordinator per process wires the document store, the relay
//! transport and the capture devices together. `enter` resolves the room,
//! checks the entry secret, joins presence and dispatches once into one of
//! two concrete session types: a `SpeakerSession` that can publish media
//! and write the authoritative deck state, and a `ListenerSession` that can
//! only subscribe and browse. Role-specific operations are unreachable on
//! the wrong type.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use lectern_core::config::SessionConfig;
use lectern_core::models::{Room, RoomId, UserId, UserRef};
use lectern_core::service::{
    ActivityLogService, AnalysisService, ChatService, PresenceService, RoomService,
    SlideSyncService,
};
use lectern_core::store::{
    ActivityLogStore, AnalysisStore, ChatStore, RoomStore, SlidePositionStore,
};
use lectern_relay::{MediaCapture, RelayConfig, RelayConnector};

use crate::error::{Result, SessionError};
use crate::listener::ListenerSession;
use crate::speaker::SpeakerSession;

/// The two participant roles, decided once at entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Publishes media and owns the authoritative deck state
    Speaker,
    /// Subscribes and may browse the deck independently
    Listener,
}

/// Everything needed to enter a session
#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub room_id: RoomId,
    pub user: UserRef,
    pub password: String,
    pub role: PeerRole,
}

impl EntryRequest {
    pub fn speaker(
        room_id: RoomId,
        user_id: UserId,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            room_id,
            user: UserRef::speaker(user_id, name),
            password: password.into(),
            role: PeerRole::Speaker,
        }
    }

    pub fn listener(
        room_id: RoomId,
        user_id: UserId,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            room_id,
            user: UserRef::listener(user_id, name),
            password: password.into(),
            role: PeerRole::Listener,
        }
    }
}

/// Events published on a session's feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The room was archived: the session is over for everyone. Published
    /// exactly once, on the `false → true` transition of the archival flag.
    Ended,
}

/// An entered session of either role
#[derive(Debug)]
pub enum Session {
    Speaker(SpeakerSession),
    Listener(ListenerSession),
}

impl Session {
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Speaker(s) => s.room_id(),
            Self::Listener(s) => s.room_id(),
        }
    }

    pub async fn leave(self) -> Result<()> {
        match self {
            Self::Speaker(s) => s.leave().await,
            Self::Listener(s) => s.leave().await,
        }
    }
}

/// Wires store, relay and capture into enterable sessions.
#[derive(Clone)]
pub struct SessionCoordinator {
    pub(crate) rooms: Arc<dyn RoomStore>,
    pub(crate) positions: Arc<dyn SlidePositionStore>,
    pub(crate) room_service: RoomService,
    pub(crate) presence: PresenceService,
    pub(crate) slide_sync: SlideSyncService,
    pub(crate) chat: ChatService,
    pub(crate) analysis: AnalysisService,
    pub(crate) activity: ActivityLogService,
    pub(crate) capture: Arc<dyn MediaCapture>,
    pub(crate) connector: Arc<dyn RelayConnector>,
    pub(crate) config: SessionConfig,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator").finish()
    }
}

impl SessionCoordinator {
    /// Wire a coordinator over one store implementing every collection
    /// contract, as the in-memory store does.
    pub fn new<S>(
        store: Arc<S>,
        capture: Arc<dyn MediaCapture>,
        connector: Arc<dyn RelayConnector>,
        config: SessionConfig,
    ) -> Self
    where
        S: RoomStore
            + SlidePositionStore
            + AnalysisStore
            + ChatStore
            + ActivityLogStore
            + 'static,
    {
        let rooms: Arc<dyn RoomStore> = store.clone();
        let positions: Arc<dyn SlidePositionStore> = store.clone();
        let analysis: Arc<dyn AnalysisStore> = store.clone();
        let chat: Arc<dyn ChatStore> = store.clone();
        let activity: Arc<dyn ActivityLogStore> = store;
        Self::from_parts(rooms, positions, analysis, chat, activity, capture, connector, config)
    }

    /// Wire a coordinator from per-collection store handles.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        rooms: Arc<dyn RoomStore>,
        positions: Arc<dyn SlidePositionStore>,
        analysis: Arc<dyn AnalysisStore>,
        chat: Arc<dyn ChatStore>,
        activity: Arc<dyn ActivityLogStore>,
        capture: Arc<dyn MediaCapture>,
        connector: Arc<dyn RelayConnector>,
        config: SessionConfig,
    ) -> Self {
        let activity_service = ActivityLogService::new(activity);
        Self {
            room_service: RoomService::new(rooms.clone()),
            presence: PresenceService::new(rooms.clone(), positions.clone(), analysis.clone()),
            slide_sync: SlideSyncService::new(
                rooms.clone(),
                positions.clone(),
                activity_service.clone(),
            ),
            chat: ChatService::new(chat),
            analysis: AnalysisService::new(rooms.clone(), analysis),
            activity: activity_service,
            rooms,
            positions,
            capture,
            connector,
            config,
        }
    }

    /// Create a room with `admin` as speaker and first member. The admin
    /// still enters through [`enter`](Self::enter) afterwards.
    pub async fn create_room(
        &self,
        admin: &UserRef,
        name: &str,
        password: &str,
    ) -> Result<Room> {
        Ok(self.room_service.create_room(admin, name, password).await?)
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        Ok(self.room_service.list_rooms().await?)
    }

    /// Enter a session, dispatching once on the requested role.
    pub async fn enter(&self, request: EntryRequest) -> Result<Session> {
        match request.role {
            PeerRole::Speaker => Ok(Session::Speaker(self.enter_speaker(request).await?)),
            PeerRole::Listener => Ok(Session::Listener(self.enter_listener(request).await?)),
        }
    }

    /// Enter as the speaker. Requires the room's admin identity.
    pub async fn enter_speaker(&self, request: EntryRequest) -> Result<SpeakerSession> {
        let room = self.resolve(&request).await?;
        if !room.is_admin(&request.user.id) {
            return Err(SessionError::NotAdmin {
                room_id: room.id,
                user_id: request.user.id,
            });
        }

        let room_id = room.id.clone();
        self.presence.join(&room_id, request.user.clone()).await?;
        match SpeakerSession::open(self, room, request.user.clone()).await {
            Ok(session) => Ok(session),
            Err(e) => {
                self.unwind_join(&room_id, &request.user.id).await;
                Err(e)
            }
        }
    }

    /// Enter as a listener.
    pub async fn enter_listener(&self, request: EntryRequest) -> Result<ListenerSession> {
        let room = self.resolve(&request).await?;

        let room_id = room.id.clone();
        self.presence.join(&room_id, request.user.clone()).await?;
        match ListenerSession::open(self, room, request.user.clone()).await {
            Ok(session) => Ok(session),
            Err(e) => {
                self.unwind_join(&room_id, &request.user.id).await;
                Err(e)
            }
        }
    }

    async fn resolve(&self, request: &EntryRequest) -> Result<Room> {
        let room = match self.room_service.fetch_room(&request.room_id).await {
            Ok(room) => room,
            Err(e) if e.is_not_found() => {
                return Err(SessionError::NotFound(request.room_id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        if room.is_archived {
            return Err(SessionError::Archived(room.id));
        }
        self.room_service.verify_password(&room, &request.password)?;
        Ok(room)
    }

    /// Best-effort removal of a half-entered participant.
    async fn unwind_join(&self, room_id: &RoomId, user_id: &UserId) {
        if let Err(e) = self.presence.leave(room_id, user_id).await {
            tracing::warn!(
                error = %e,
                room_id = %room_id,
                user_id = %user_id,
                "Failed to unwind membership after aborted entry"
            );
        }
    }

    pub(crate) fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            join_timeout_secs: self.config.relay_join_timeout_secs,
        }
    }

    /// Subscribe to the room document and translate its snapshots into the
    /// session's cache cell and event feed.
    pub(crate) async fn watch_room(&self, room: &Room) -> Result<RoomWatch> {
        let mut sub = self.rooms.subscribe(&room.id).await?;
        let initial = sub.current();
        let (snap_tx, snap_rx) = watch::channel(initial.clone());
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Entry rejected archived rooms, but archival may have landed
        // between resolve and subscribe.
        let mut was_archived = initial.is_archived;
        if was_archived {
            let _ = event_tx.send(SessionEvent::Ended);
        }

        let task = tokio::spawn(async move {
            while let Some(snapshot) = sub.next().await {
                let archived = snapshot.is_archived;
                snap_tx.send_replace(snapshot);
                if archived && !was_archived {
                    was_archived = true;
                    let _ = event_tx.send(SessionEvent::Ended);
                }
            }
        });

        Ok(RoomWatch {
            snapshots: snap_rx,
            events: event_rx,
            task,
        })
    }
}

/// A running room-document watch: the latest snapshot, the session event
/// feed, and the pump task driving both.
pub(crate) struct RoomWatch {
    pub(crate) snapshots: watch::Receiver<Room>,
    pub(crate) events: mpsc::UnboundedReceiver<SessionEvent>,
    pub(crate) task: tokio::task::JoinHandle<()>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{harness, seeded_room};

    #[tokio::test]
    async fn test_enter_unknown_room_is_not_found() {
        let h = harness();
        let err = h
            .coordinator
            .enter(EntryRequest::listener(
                RoomId::from("missing"),
                UserId::from("u1"),
                "Alice",
                "secret",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_enter_with_wrong_password_is_rejected() {
        let h = harness();
        let room = seeded_room(&h).await;

        let err = h
            .coordinator
            .enter(EntryRequest::listener(
                room.id.clone(),
                UserId::from("u1"),
                "Alice",
                "wrong",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::WrongPassword));

        // The rejected participant never made it into the membership set.
        let snapshot = h.coordinator.list_rooms().await.unwrap().remove(0);
        assert_eq!(snapshot.user_count(), 1);
    }

    #[tokio::test]
    async fn test_speaker_entry_requires_admin_identity() {
        let h = harness();
        let room = seeded_room(&h).await;

        let err = h
            .coordinator
            .enter(EntryRequest::speaker(
                room.id.clone(),
                UserId::from("impostor"),
                "Mallory",
                "secret",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotAdmin { .. }));
    }

    #[tokio::test]
    async fn test_enter_archived_room_is_rejected() {
        let h = harness();
        let room = seeded_room(&h).await;
        h.coordinator.room_service.archive(&room.id).await.unwrap();

        let err = h
            .coordinator
            .enter(EntryRequest::listener(
                room.id.clone(),
                UserId::from("u1"),
                "Alice",
                "secret",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Archived(_)));
    }

    #[tokio::test]
    async fn test_role_dispatch_yields_concrete_session_types() {
        let h = harness();
        let room = seeded_room(&h).await;

        let speaker = h
            .coordinator
            .enter(EntryRequest::speaker(
                room.id.clone(),
                UserId::from("admin1"),
                "Prof. A",
                "secret",
            ))
            .await
            .unwrap();
        assert!(matches!(speaker, Session::Speaker(_)));

        let listener = h
            .coordinator
            .enter(EntryRequest::listener(
                room.id.clone(),
                UserId::from("u1"),
                "Alice",
                "secret",
            ))
            .await
            .unwrap();
        assert!(matches!(listener, Session::Listener(_)));

        let snapshot = h.coordinator.list_rooms().await.unwrap().remove(0);
        assert_eq!(snapshot.user_count(), 2);
        assert!(snapshot.contains_user(&UserId::from("u1")));
    }

    #[tokio::test]
    async fn test_failed_listener_entry_unwinds_membership() {
        let h = harness();
        let room = seeded_room(&h).await;
        h.connector.deny_join(true);

        let err = h
            .coordinator
            .enter(EntryRequest::listener(
                room.id.clone(),
                UserId::from("u1"),
                "Alice",
                "secret",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::RelayJoinFailed(_)));

        let snapshot = h.coordinator.list_rooms().await.unwrap().remove(0);
        assert!(!snapshot.contains_user(&UserId::from("u1")));
    }
}
