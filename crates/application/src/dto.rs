use domain::{Message, Room, RoomParticipant, Timestamp, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_online: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            username: user.username.as_str().to_owned(),
            email: user.email.as_str().to_owned(),
            avatar: user.avatar.clone(),
            is_online: user.is_online,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub creator_id: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Room> for RoomDto {
    fn from(room: &Room) -> Self {
        Self {
            id: Uuid::from(room.id),
            name: room.name.clone(),
            description: room.description.clone(),
            is_private: room.is_private,
            creator_id: Uuid::from(room.creator_id),
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

/// 房间详情，附带持久成员的用户ID集合。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetailDto {
    #[serde(flatten)]
    pub room: RoomDto,
    pub participants: Vec<Uuid>,
}

impl RoomDetailDto {
    pub fn new(room: &Room, participants: &[RoomParticipant]) -> Self {
        Self {
            room: RoomDto::from(room),
            participants: participants
                .iter()
                .map(|participant| Uuid::from(participant.user_id))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub content: String,
    pub sender_id: Uuid,
    pub room_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: Uuid::from(message.id),
            content: message.content.as_str().to_owned(),
            sender_id: Uuid::from(message.sender_id),
            room_id: message.room_id().map(Into::into),
            recipient_id: message.recipient_id().map(Into::into),
            is_read: message.is_read,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}
