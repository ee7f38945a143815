use crate::errors::DomainError;
use crate::value_objects::{RoomId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub creator_id: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Room {
    /// 创建房间。持久化时创建者必须同时写入成员集合。
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        description: Option<String>,
        is_private: bool,
        creator_id: UserId,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(name.into())?;
        Ok(Self {
            id,
            name,
            description,
            is_private,
            creator_id,
            created_at,
            updated_at: created_at,
        })
    }

    fn validate_name(name: String) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument(
                "room_name",
                "cannot be empty",
            ));
        }
        if trimmed.len() > 60 {
            return Err(DomainError::invalid_argument("room_name", "too long"));
        }
        Ok(trimmed.to_owned())
    }
}
