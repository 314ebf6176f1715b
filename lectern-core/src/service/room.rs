//! Room lifecycle service
//!
//! Creation, lookup, entry checks and archival of the room aggregate.
//! Archival is terminal: a departing speaker marks the room archived so
//! every subscribed listener observes the end of the session; the room
//! document itself is never deleted.

use std::sync::Arc;

use crate::models::{Room, RoomId, UserId, UserRef};
use crate::store::RoomStore;
use crate::validation;
use crate::{Error, Result};

#[derive(Clone)]
pub struct RoomService {
    rooms: Arc<dyn RoomStore>,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService").finish()
    }
}

impl RoomService {
    pub fn new(rooms: Arc<dyn RoomStore>) -> Self {
        Self { rooms }
    }

    /// Create a room with `admin` as speaker and first member.
    pub async fn create_room(
        &self,
        admin: &UserRef,
        name: &str,
        password: &str,
    ) -> Result<Room> {
        validation::validate_room_name(name)?;
        validation::validate_room_password(password)?;
        validation::validate_nickname(&admin.name)?;

        let room = Room::new(name, admin, password);
        self.rooms.insert(room.clone()).await?;

        tracing::info!(
            room_id = %room.id,
            admin_id = %room.admin_id,
            "Room created"
        );
        Ok(room)
    }

    /// Resolve a room id. Fails with `NotFound` when it does not resolve;
    /// the caller must not retry blindly.
    pub async fn fetch_room(&self, id: &RoomId) -> Result<Room> {
        self.rooms
            .fetch(id)
            .await?
            .ok_or_else(|| Error::room_not_found(id))
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.rooms.fetch_all().await
    }

    pub async fn user_count(&self, id: &RoomId) -> Result<usize> {
        Ok(self.fetch_room(id).await?.user_count())
    }

    /// Compare the shared entry secret. Hashing is the auth collaborator's
    /// concern; the room password is a plaintext shared secret by design.
    pub fn verify_password(&self, room: &Room, password: &str) -> Result<()> {
        if room.password == password {
            Ok(())
        } else {
            Err(Error::WrongPassword)
        }
    }

    /// Only the room's admin may act as speaker.
    pub fn require_admin(&self, room: &Room, user_id: &UserId) -> Result<()> {
        if room.is_admin(user_id) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "User {user_id} is not the admin of room {}",
                room.id
            )))
        }
    }

    /// Mark the room archived. Idempotent and terminal; history survives.
    pub async fn archive(&self, id: &RoomId) -> Result<()> {
        self.rooms.archive(id).await?;
        tracing::info!(room_id = %id, "Room archived");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> (RoomService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RoomService::new(store.clone()), store)
    }

    fn admin() -> UserRef {
        UserRef::speaker(UserId::from("admin1"), "Prof. A")
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let (service, _) = service();
        let room = service
            .create_room(&admin(), "Lecture 1", "secret")
            .await
            .unwrap();

        let fetched = service.fetch_room(&room.id).await.unwrap();
        assert_eq!(fetched.name, "Lecture 1");
        assert_eq!(service.user_count(&room.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_missing_room_is_not_found() {
        let (service, _) = service();
        let err = service.fetch_room(&RoomId::from("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let (service, _) = service();
        assert!(service.create_room(&admin(), "", "secret").await.is_err());
        assert!(service.create_room(&admin(), "Lecture", "abc").await.is_err());
    }

    #[tokio::test]
    async fn test_password_and_admin_checks() {
        let (service, _) = service();
        let room = service
            .create_room(&admin(), "Lecture 1", "secret")
            .await
            .unwrap();

        assert!(service.verify_password(&room, "secret").is_ok());
        assert!(matches!(
            service.verify_password(&room, "wrong"),
            Err(Error::WrongPassword)
        ));

        assert!(service.require_admin(&room, &UserId::from("admin1")).is_ok());
        assert!(matches!(
            service.require_admin(&room, &UserId::from("u1")),
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_archive_never_deletes() {
        let (service, _) = service();
        let room = service
            .create_room(&admin(), "Lecture 1", "secret")
            .await
            .unwrap();

        service.archive(&room.id).await.unwrap();
        let fetched = service.fetch_room(&room.id).await.unwrap();
        assert!(fetched.is_archived);
    }
}
