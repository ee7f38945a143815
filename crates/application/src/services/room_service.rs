use std::sync::Arc;

use domain::{
    DomainError, RepositoryError, Room, RoomId, RoomParticipant, UserId,
};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    registry::RoomRegistry,
    repository::{ParticipantRepository, RoomRepository},
};

#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub creator_id: Uuid,
}

pub struct RoomServiceDependencies {
    pub room_repository: Arc<dyn RoomRepository>,
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub registry: Arc<RoomRegistry>,
    pub clock: Arc<dyn Clock>,
}

/// 成员资格授权方：所有针对持久成员集合的判定与变更都经过这里。
pub struct RoomService {
    deps: RoomServiceDependencies,
}

impl RoomService {
    pub fn new(deps: RoomServiceDependencies) -> Self {
        Self { deps }
    }

    /// 创建房间。创建者的成员资格由仓库在同一原子操作内写入。
    pub async fn create_room(&self, request: CreateRoomRequest) -> Result<Room, ApplicationError> {
        let now = self.deps.clock.now();
        let room = Room::new(
            RoomId::from(Uuid::new_v4()),
            request.name,
            request.description,
            request.is_private,
            UserId::from(request.creator_id),
            now,
        )?;
        Ok(self.deps.room_repository.create_with_creator(room).await?)
    }

    /// 加入房间。已是成员时返回冲突错误而不是静默成功。
    pub async fn join(&self, room_id: RoomId, user_id: UserId) -> Result<(), ApplicationError> {
        self.find_room(room_id).await?;

        let participant = RoomParticipant::new(room_id, user_id, self.deps.clock.now());
        match self.deps.participant_repository.add(participant).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict) => Err(DomainError::AlreadyParticipant.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// 离开房间。非成员离开是错误；成功后立刻剪除该用户在此房间的
    /// 实时会话，持久权限与实时投递同时失效。
    pub async fn leave(&self, room_id: RoomId, user_id: UserId) -> Result<(), ApplicationError> {
        self.find_room(room_id).await?;

        match self
            .deps
            .participant_repository
            .remove(room_id, user_id)
            .await
        {
            Ok(()) => {
                let pruned = self.deps.registry.prune_user_from_room(user_id, room_id).await;
                tracing::debug!(
                    room_id = %room_id,
                    user_id = %user_id,
                    pruned,
                    "user left room"
                );
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(DomainError::NotParticipant.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// 房间存在且用户是持久成员。
    pub async fn can_read_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<bool, ApplicationError> {
        if self.deps.room_repository.find_by_id(room_id).await?.is_none() {
            return Ok(false);
        }
        Ok(self
            .deps
            .participant_repository
            .contains(room_id, user_id)
            .await?)
    }

    /// 同 `can_read_room`，但以错误区分“房间不存在”与“不是成员”。
    pub async fn ensure_participant(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<(), ApplicationError> {
        self.find_room(room_id).await?;
        let member = self
            .deps
            .participant_repository
            .contains(room_id, user_id)
            .await?;
        if !member {
            return Err(DomainError::NotRoomParticipant.into());
        }
        Ok(())
    }

    pub async fn list_public_rooms(&self) -> Result<Vec<Room>, ApplicationError> {
        Ok(self.deps.room_repository.list_public().await?)
    }

    pub async fn get_room(
        &self,
        room_id: RoomId,
    ) -> Result<(Room, Vec<RoomParticipant>), ApplicationError> {
        let room = self.find_room(room_id).await?;
        let participants = self.deps.participant_repository.list(room_id).await?;
        Ok((room, participants))
    }

    async fn find_room(&self, room_id: RoomId) -> Result<Room, ApplicationError> {
        self.deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| DomainError::RoomNotFound.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestEnv;

    #[tokio::test]
    async fn creator_is_a_participant_from_creation() {
        let env = TestEnv::new();
        let alice = env.register_user("alice", "alice@example.com").await;
        let room = env.create_room(&alice, "general").await;

        assert!(env
            .room_service
            .can_read_room(alice.id, room.id)
            .await
            .unwrap());

        let (_, participants) = env.room_service.get_room(room.id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].user_id, alice.id);
    }

    #[tokio::test]
    async fn join_twice_is_a_conflict() {
        let env = TestEnv::new();
        let alice = env.register_user("alice", "alice@example.com").await;
        let bob = env.register_user("bob", "bob@example.com").await;
        let room = env.create_room(&alice, "general").await;

        env.room_service.join(room.id, bob.id).await.unwrap();
        assert!(env.room_service.can_read_room(bob.id, room.id).await.unwrap());

        let second = env.room_service.join(room.id, bob.id).await;
        assert!(matches!(
            second,
            Err(ApplicationError::Domain(DomainError::AlreadyParticipant))
        ));
    }

    #[tokio::test]
    async fn leave_without_membership_is_invalid() {
        let env = TestEnv::new();
        let alice = env.register_user("alice", "alice@example.com").await;
        let bob = env.register_user("bob", "bob@example.com").await;
        let room = env.create_room(&alice, "general").await;

        let result = env.room_service.leave(room.id, bob.id).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::NotParticipant))
        ));
    }

    #[tokio::test]
    async fn join_or_leave_of_missing_room_is_not_found() {
        let env = TestEnv::new();
        let alice = env.register_user("alice", "alice@example.com").await;
        let missing = RoomId::from(Uuid::new_v4());

        assert!(matches!(
            env.room_service.join(missing, alice.id).await,
            Err(ApplicationError::Domain(DomainError::RoomNotFound))
        ));
        assert!(matches!(
            env.room_service.leave(missing, alice.id).await,
            Err(ApplicationError::Domain(DomainError::RoomNotFound))
        ));
        assert!(!env
            .room_service
            .can_read_room(alice.id, missing)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn leave_prunes_live_sessions_immediately() {
        let env = TestEnv::new();
        let alice = env.register_user("alice", "alice@example.com").await;
        let bob = env.register_user("bob", "bob@example.com").await;
        let room = env.create_room(&alice, "general").await;
        env.room_service.join(room.id, bob.id).await.unwrap();

        let mut live = env.registry.register(bob.id).await;
        env.registry.join(live.session_id, room.id).await.unwrap();

        env.room_service.leave(room.id, bob.id).await.unwrap();

        let delivered = env
            .registry
            .broadcast_room(
                room.id,
                crate::events::LiveEvent::Typing {
                    room_id: room.id.into(),
                    user_id: alice.id.into(),
                    is_typing: true,
                },
                None,
            )
            .await;
        assert_eq!(delivered, 0);
        assert!(live.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn public_listing_excludes_private_rooms() {
        let env = TestEnv::new();
        let alice = env.register_user("alice", "alice@example.com").await;
        env.create_room(&alice, "open").await;
        env.room_service
            .create_room(CreateRoomRequest {
                name: "hidden".into(),
                description: None,
                is_private: true,
                creator_id: alice.id.into(),
            })
            .await
            .unwrap();

        let rooms = env.room_service.list_public_rooms().await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "open");
    }
}
