use domain::{Message, Timestamp, Username};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 实时投递给客户端的事件。
///
/// `Message` 事件总是先持久化再投递；其余事件是瞬态的，从不落盘。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    Message {
        id: Uuid,
        room_id: Option<Uuid>,
        recipient_id: Option<Uuid>,
        sender_id: Uuid,
        sender_username: String,
        content: String,
        created_at: Timestamp,
    },
    Typing {
        room_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },
    UserJoined {
        room_id: Uuid,
        user_id: Uuid,
    },
    UserLeft {
        room_id: Uuid,
        user_id: Uuid,
    },
    Error {
        code: String,
        message: String,
    },
}

impl LiveEvent {
    pub fn message(message: &Message, sender_username: &Username) -> Self {
        Self::Message {
            id: message.id.into(),
            room_id: message.room_id().map(Into::into),
            recipient_id: message.recipient_id().map(Into::into),
            sender_id: message.sender_id.into(),
            sender_username: sender_username.as_str().to_owned(),
            content: message.content.as_str().to_owned(),
            created_at: message.created_at,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
