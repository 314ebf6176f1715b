//! Shared wiring for the session tests: in-memory store, capture/relay
//! fakes, and a seeded room.

use std::sync::Arc;

use lectern_core::config::SessionConfig;
use lectern_core::models::{Room, UserId, UserRef};
use lectern_core::store::MemoryStore;
use lectern_relay::testing::{FakeCapture, FakeRelayConnector};

use crate::coordinator::SessionCoordinator;

pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub capture: Arc<FakeCapture>,
    pub connector: Arc<FakeRelayConnector>,
    pub coordinator: SessionCoordinator,
}

pub(crate) fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let capture = Arc::new(FakeCapture::new());
    let connector = Arc::new(FakeRelayConnector::new());
    let coordinator = SessionCoordinator::new(
        store.clone(),
        capture.clone(),
        connector.clone(),
        SessionConfig::default(),
    );
    Harness {
        store,
        capture,
        connector,
        coordinator,
    }
}

/// A room owned by `admin1` with password `secret`.
pub(crate) async fn seeded_room(h: &Harness) -> Room {
    let admin = UserRef::speaker(UserId::from("admin1"), "Prof. A");
    h.coordinator
        .create_room(&admin, "Lecture 1", "secret")
        .await
        .unwrap()
}

/// Let detached tasks (watch pumps, fire-and-forget appends) run.
pub(crate) async fn drain_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
