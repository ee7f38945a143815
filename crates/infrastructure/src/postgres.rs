//! Postgres 仓库实现。
//!
//! 成员集合的原子性依赖 `room_participants` 的复合主键：
//! 并发加入撞上唯一约束即为冲突，不存在丢失更新。

use application::{MessageRepository, ParticipantRepository, RoomRepository, UserRepository};
use async_trait::async_trait;
use domain::{
    Message, MessageAddress, MessageContent, MessageId, PasswordHash, RepositoryError, Room,
    RoomId, RoomParticipant, User, UserEmail, UserId, Username,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    avatar: Option<String>,
    is_online: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username =
            Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            username,
            email,
            password,
            avatar: value.avatar,
            is_online: value.is_online,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_private: bool,
    creator_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RoomRecord> for Room {
    fn from(value: RoomRecord) -> Self {
        Room {
            id: RoomId::from(value.id),
            name: value.name,
            description: value.description,
            is_private: value.is_private,
            creator_id: UserId::from(value.creator_id),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ParticipantRecord {
    room_id: Uuid,
    user_id: Uuid,
    joined_at: OffsetDateTime,
}

impl From<ParticipantRecord> for RoomParticipant {
    fn from(value: ParticipantRecord) -> Self {
        RoomParticipant {
            room_id: RoomId::from(value.room_id),
            user_id: UserId::from(value.user_id),
            joined_at: value.joined_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    content: String,
    sender_id: Uuid,
    room_id: Option<Uuid>,
    recipient_id: Option<Uuid>,
    is_read: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;
        let address = match (value.room_id, value.recipient_id) {
            (Some(room_id), None) => MessageAddress::Room(RoomId::from(room_id)),
            (None, Some(recipient_id)) => MessageAddress::Direct(UserId::from(recipient_id)),
            _ => return Err(invalid_data("message must have exactly one address")),
        };
        Ok(Message {
            id: MessageId::from(value.id),
            sender_id: UserId::from(value.sender_id),
            address,
            content,
            is_read: value.is_read,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, password_hash, avatar, is_online, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, username, email, password_hash, avatar, is_online, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.avatar.as_deref())
        .bind(user.is_online)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, avatar = $5, is_online = $6, updated_at = $7
            WHERE id = $1
            RETURNING id, username, email, password_hash, avatar, is_online, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.avatar.as_deref())
        .bind(user.is_online)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, password_hash, avatar, is_online, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, password_hash, avatar, is_online, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, password_hash, avatar, is_online, created_at, updated_at FROM users WHERE username = $1",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn create_with_creator(&self, room: Room) -> Result<Room, RepositoryError> {
        // 房间与创建者成员资格同属一个事务
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, RoomRecord>(
            r#"
            INSERT INTO rooms (id, name, description, is_private, creator_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, is_private, creator_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(room.id))
        .bind(room.name.as_str())
        .bind(room.description.as_deref())
        .bind(room.is_private)
        .bind(Uuid::from(room.creator_id))
        .bind(room.created_at)
        .bind(room.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            "INSERT INTO room_participants (room_id, user_id, joined_at) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::from(room.id))
        .bind(Uuid::from(room.creator_id))
        .bind(room.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(Room::from(record))
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            "SELECT id, name, description, is_private, creator_id, created_at, updated_at FROM rooms WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Room::from))
    }

    async fn list_public(&self) -> Result<Vec<Room>, RepositoryError> {
        let records = sqlx::query_as::<_, RoomRecord>(
            "SELECT id, name, description, is_private, creator_id, created_at, updated_at FROM rooms WHERE is_private = FALSE ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Room::from).collect())
    }
}

#[derive(Clone)]
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn add(&self, participant: RoomParticipant) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO room_participants (room_id, user_id, joined_at) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::from(participant.room_id))
        .bind(Uuid::from(participant.user_id))
        .bind(participant.joined_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn remove(&self, room_id: RoomId, user_id: UserId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM room_participants WHERE room_id = $1 AND user_id = $2")
                .bind(Uuid::from(room_id))
                .bind(Uuid::from(user_id))
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn contains(&self, room_id: RoomId, user_id: UserId) -> Result<bool, RepositoryError> {
        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM room_participants WHERE room_id = $1 AND user_id = $2")
                .bind(Uuid::from(room_id))
                .bind(Uuid::from(user_id))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        Ok(exists.is_some())
    }

    async fn list(&self, room_id: RoomId) -> Result<Vec<RoomParticipant>, RepositoryError> {
        let records = sqlx::query_as::<_, ParticipantRecord>(
            "SELECT room_id, user_id, joined_at FROM room_participants WHERE room_id = $1 ORDER BY joined_at ASC",
        )
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(RoomParticipant::from).collect())
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, content, sender_id, room_id, recipient_id, is_read, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, content, sender_id, room_id, recipient_id, is_read, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(message.content.as_str())
        .bind(Uuid::from(message.sender_id))
        .bind(message.room_id().map(Uuid::from))
        .bind(message.recipient_id().map(Uuid::from))
        .bind(message.is_read)
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        // 只有已读标记和更新时间是可变的
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            UPDATE messages
            SET is_read = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, content, sender_id, room_id, recipient_id, is_read, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(message.is_read)
        .bind(message.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, content, sender_id, room_id, recipient_id, is_read, created_at, updated_at FROM messages WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn list_by_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, content, sender_id, room_id, recipient_id, is_read, created_at, updated_at FROM messages WHERE room_id = $1 ORDER BY created_at ASC",
        )
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn list_private_for(&self, user_id: UserId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, content, sender_id, room_id, recipient_id, is_read, created_at, updated_at
            FROM messages
            WHERE (sender_id = $1 AND recipient_id IS NOT NULL) OR recipient_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}
