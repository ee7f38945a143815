//! 内存实现的存储仓库（用于测试与无数据库运行）。
//!
//! 各仓库共享同一个 `MemoryDatabase`，房间创建与创建者入座
//! 在同一把写锁内完成，与 Postgres 实现的事务语义一致。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    Message, MessageId, RepositoryError, Room, RoomId, RoomParticipant, User, UserEmail, UserId,
    Username,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::{
    MessageRepository, ParticipantRepository, RoomRepository, UserRepository,
};

#[derive(Default)]
pub struct MemoryDatabase {
    users: RwLock<HashMap<Uuid, User>>,
    rooms: RwLock<HashMap<Uuid, Room>>,
    participants: RwLock<HashMap<Uuid, Vec<RoomParticipant>>>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[derive(Clone)]
pub struct MemoryUserRepository {
    db: Arc<MemoryDatabase>,
}

impl MemoryUserRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.db.users.write().await;
        let duplicate = users.values().any(|existing| {
            existing.username == user.username || existing.email == user.email
        });
        if duplicate || users.contains_key(&Uuid::from(user.id)) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(Uuid::from(user.id), user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.db.users.write().await;
        let slot = users
            .get_mut(&Uuid::from(user.id))
            .ok_or(RepositoryError::NotFound)?;
        *slot = user.clone();
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.db.users.read().await;
        Ok(users.get(&Uuid::from(id)).cloned())
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let users = self.db.users.read().await;
        Ok(users.values().find(|user| &user.email == email).cloned())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.db.users.read().await;
        Ok(users
            .values()
            .find(|user| &user.username == username)
            .cloned())
    }
}

#[derive(Clone)]
pub struct MemoryRoomRepository {
    db: Arc<MemoryDatabase>,
}

impl MemoryRoomRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoomRepository for MemoryRoomRepository {
    async fn create_with_creator(&self, room: Room) -> Result<Room, RepositoryError> {
        // 房间与创建者成员资格在同一临界区写入
        let mut rooms = self.db.rooms.write().await;
        let mut participants = self.db.participants.write().await;

        let room_key = Uuid::from(room.id);
        if rooms.contains_key(&room_key) {
            return Err(RepositoryError::Conflict);
        }
        rooms.insert(room_key, room.clone());
        participants.entry(room_key).or_default().push(
            RoomParticipant::new(room.id, room.creator_id, room.created_at),
        );
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let rooms = self.db.rooms.read().await;
        Ok(rooms.get(&Uuid::from(id)).cloned())
    }

    async fn list_public(&self) -> Result<Vec<Room>, RepositoryError> {
        let rooms = self.db.rooms.read().await;
        let mut public: Vec<Room> = rooms
            .values()
            .filter(|room| !room.is_private)
            .cloned()
            .collect();
        public.sort_by_key(|room| room.created_at);
        Ok(public)
    }
}

#[derive(Clone)]
pub struct MemoryParticipantRepository {
    db: Arc<MemoryDatabase>,
}

impl MemoryParticipantRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ParticipantRepository for MemoryParticipantRepository {
    async fn add(&self, participant: RoomParticipant) -> Result<(), RepositoryError> {
        let mut participants = self.db.participants.write().await;
        let entry = participants
            .entry(Uuid::from(participant.room_id))
            .or_default();
        if entry
            .iter()
            .any(|existing| existing.user_id == participant.user_id)
        {
            return Err(RepositoryError::Conflict);
        }
        entry.push(participant);
        Ok(())
    }

    async fn remove(&self, room_id: RoomId, user_id: UserId) -> Result<(), RepositoryError> {
        let mut participants = self.db.participants.write().await;
        let entry = participants
            .get_mut(&Uuid::from(room_id))
            .ok_or(RepositoryError::NotFound)?;
        let before = entry.len();
        entry.retain(|participant| participant.user_id != user_id);
        if entry.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn contains(&self, room_id: RoomId, user_id: UserId) -> Result<bool, RepositoryError> {
        let participants = self.db.participants.read().await;
        Ok(participants
            .get(&Uuid::from(room_id))
            .map(|entry| entry.iter().any(|p| p.user_id == user_id))
            .unwrap_or(false))
    }

    async fn list(&self, room_id: RoomId) -> Result<Vec<RoomParticipant>, RepositoryError> {
        let participants = self.db.participants.read().await;
        Ok(participants
            .get(&Uuid::from(room_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct MemoryMessageRepository {
    db: Arc<MemoryDatabase>,
}

impl MemoryMessageRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.db.messages.write().await;
        if messages.iter().any(|existing| existing.id == message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.push(message.clone());
        Ok(message)
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.db.messages.write().await;
        let slot = messages
            .iter_mut()
            .find(|existing| existing.id == message.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = message.clone();
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let messages = self.db.messages.read().await;
        Ok(messages.iter().find(|message| message.id == id).cloned())
    }

    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.db.messages.read().await;
        let mut history: Vec<Message> = messages
            .iter()
            .filter(|message| message.room_id() == Some(room_id))
            .cloned()
            .collect();
        // 稳定排序：时间相同保持插入顺序
        history.sort_by_key(|message| message.created_at);
        Ok(history)
    }

    async fn list_private_for(&self, user_id: UserId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.db.messages.read().await;
        let mut history: Vec<Message> = messages
            .iter()
            .filter(|message| {
                let sent = message.sender_id == user_id && message.recipient_id().is_some();
                let received = message.recipient_id() == Some(user_id);
                sent || received
            })
            .cloned()
            .collect();
        history.sort_by_key(|message| message.created_at);
        Ok(history)
    }
}
