//! 服务层测试环境：内存仓库 + 真实注册表，无外部依赖。

use std::sync::Arc;

use async_trait::async_trait;
use domain::{PasswordHash, Room, User};

use crate::{
    clock::SystemClock,
    memory::{
        MemoryDatabase, MemoryMessageRepository, MemoryParticipantRepository,
        MemoryRoomRepository, MemoryUserRepository,
    },
    password::{PasswordHasher, PasswordHasherError},
    registry::RoomRegistry,
    services::{
        CreateRoomRequest, MessageService, MessageServiceDependencies, RegisterUserRequest,
        RoomService, RoomServiceDependencies, UserService, UserServiceDependencies,
    },
};

/// 明文“哈希”，只用于测试。
pub struct PlainPasswordHasher;

#[async_trait]
impl PasswordHasher for PlainPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        PasswordHash::new(format!("plain:{plaintext}"))
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        Ok(hashed.as_str() == format!("plain:{plaintext}"))
    }
}

pub struct TestEnv {
    pub registry: Arc<RoomRegistry>,
    pub user_service: UserService,
    pub room_service: RoomService,
    pub message_service: MessageService,
}

impl TestEnv {
    pub const DEFAULT_PASSWORD: &'static str = "s3cret";

    pub fn new() -> Self {
        let db = MemoryDatabase::new();
        let registry = Arc::new(RoomRegistry::new());
        let clock = Arc::new(SystemClock);
        let hasher = Arc::new(PlainPasswordHasher);

        let user_repository = Arc::new(MemoryUserRepository::new(db.clone()));
        let room_repository = Arc::new(MemoryRoomRepository::new(db.clone()));
        let participant_repository = Arc::new(MemoryParticipantRepository::new(db.clone()));
        let message_repository = Arc::new(MemoryMessageRepository::new(db));

        let user_service = UserService::new(UserServiceDependencies {
            user_repository: user_repository.clone(),
            password_hasher: hasher,
            clock: clock.clone(),
        });
        let room_service = RoomService::new(RoomServiceDependencies {
            room_repository: room_repository.clone(),
            participant_repository: participant_repository.clone(),
            registry: registry.clone(),
            clock: clock.clone(),
        });
        let message_service = MessageService::new(MessageServiceDependencies {
            message_repository,
            room_repository,
            participant_repository,
            user_repository,
            registry: registry.clone(),
            clock,
        });

        Self {
            registry,
            user_service,
            room_service,
            message_service,
        }
    }

    pub async fn register_user(&self, username: &str, email: &str) -> User {
        self.user_service
            .register(RegisterUserRequest {
                username: username.into(),
                email: email.into(),
                password: Self::DEFAULT_PASSWORD.into(),
            })
            .await
            .unwrap()
    }

    pub async fn create_room(&self, creator: &User, name: &str) -> Room {
        self.room_service
            .create_room(CreateRoomRequest {
                name: name.into(),
                description: None,
                is_private: false,
                creator_id: creator.id.into(),
            })
            .await
            .unwrap()
    }
}
