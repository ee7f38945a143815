use crate::value_objects::{RoomId, Timestamp, UserId};

/// 房间的持久成员资格，按 (room_id, user_id) 唯一。
///
/// 成员集合只通过显式的加入/离开操作变化，消息活动不会影响它。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoomParticipant {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub joined_at: Timestamp,
}

impl RoomParticipant {
    pub fn new(room_id: RoomId, user_id: UserId, joined_at: Timestamp) -> Self {
        Self {
            room_id,
            user_id,
            joined_at,
        }
    }
}
