use thiserror::Error;

/// 领域层错误。
///
/// 变体与对外的错误分类一一对应：资源不存在、冲突、权限不足、
/// 非法状态以及认证失败。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: &'static str,
    },
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("room not found")]
    RoomNotFound,
    #[error("message not found")]
    MessageNotFound,
    #[error("user already joined room")]
    AlreadyParticipant,
    #[error("user is not a participant of the room")]
    NotParticipant,
    #[error("user may not access this room")]
    NotRoomParticipant,
    #[error("only the recipient may mark a message as read")]
    NotMessageRecipient,
    #[error("message is not addressed to a recipient")]
    NotDirectMessage,
    #[error("session is closed")]
    SessionClosed,
}

impl DomainError {
    pub fn invalid_argument(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidArgument { field, reason }
    }
}

/// 存储层错误。
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
