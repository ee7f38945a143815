use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password: PasswordHash,
    pub avatar: Option<String>,
    /// 尽力而为的在线标记，实时投递不依赖它。
    pub is_online: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        email: UserEmail,
        password: PasswordHash,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password,
            avatar: None,
            is_online: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_online(&mut self, online: bool, now: Timestamp) {
        self.is_online = online;
        self.updated_at = now;
    }

    pub fn set_avatar(&mut self, avatar: Option<String>, now: Timestamp) {
        self.avatar = avatar;
        self.updated_at = now;
    }
}
