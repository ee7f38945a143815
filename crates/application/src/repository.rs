use async_trait::async_trait;
use domain::{
    Message, MessageId, RepositoryError, Room, RoomId, RoomParticipant, User, UserEmail, UserId,
    Username,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &Username)
        -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 创建房间，并在同一原子操作内把创建者写入成员集合。
    async fn create_with_creator(&self, room: Room) -> Result<Room, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;
    async fn list_public(&self) -> Result<Vec<Room>, RepositoryError>;
}

/// 持久成员集合。加入/离开必须按房间原子执行：
/// `add` 在已存在时返回 `Conflict`，`remove` 在不存在时返回 `NotFound`，
/// 并发的读-改-写不会丢失更新。
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn add(&self, participant: RoomParticipant) -> Result<(), RepositoryError>;
    async fn remove(&self, room_id: RoomId, user_id: UserId) -> Result<(), RepositoryError>;
    async fn contains(&self, room_id: RoomId, user_id: UserId) -> Result<bool, RepositoryError>;
    async fn list(&self, room_id: RoomId) -> Result<Vec<RoomParticipant>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn update(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
    /// 房间历史，按创建时间升序。
    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError>;
    /// 用户的私聊历史：本人发出的带收件人消息与发给本人的消息，按创建时间升序。
    async fn list_private_for(&self, user_id: UserId) -> Result<Vec<Message>, RepositoryError>;
}
