use crate::errors::DomainError;
use crate::value_objects::{MessageContent, MessageId, RoomId, Timestamp, UserId};

/// 消息的投递地址：房间消息或私聊消息，二者必居其一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MessageAddress {
    Room(RoomId),
    Direct(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub address: MessageAddress,
    pub content: MessageContent,
    /// 仅对私聊消息有意义。
    pub is_read: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    pub fn room(
        id: MessageId,
        room_id: RoomId,
        sender_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender_id,
            address: MessageAddress::Room(room_id),
            content,
            is_read: false,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn direct(
        id: MessageId,
        recipient_id: UserId,
        sender_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender_id,
            address: MessageAddress::Direct(recipient_id),
            content,
            is_read: false,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn room_id(&self) -> Option<RoomId> {
        match self.address {
            MessageAddress::Room(room_id) => Some(room_id),
            MessageAddress::Direct(_) => None,
        }
    }

    pub fn recipient_id(&self) -> Option<UserId> {
        match self.address {
            MessageAddress::Room(_) => None,
            MessageAddress::Direct(user_id) => Some(user_id),
        }
    }

    /// 标记为已读。只有被收件人调用才合法；重复标记是幂等的成功。
    pub fn mark_read(&mut self, reader: UserId, now: Timestamp) -> Result<(), DomainError> {
        match self.address {
            MessageAddress::Room(_) => Err(DomainError::NotDirectMessage),
            MessageAddress::Direct(recipient) if recipient != reader => {
                Err(DomainError::NotMessageRecipient)
            }
            MessageAddress::Direct(_) => {
                if !self.is_read {
                    self.is_read = true;
                    self.updated_at = now;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_direct() -> (Message, UserId, UserId) {
        let now = time::OffsetDateTime::now_utc();
        let sender = UserId::from(Uuid::new_v4());
        let recipient = UserId::from(Uuid::new_v4());
        let message = Message::direct(
            MessageId::from(Uuid::new_v4()),
            recipient,
            sender,
            MessageContent::new("secret").unwrap(),
            now,
        );
        (message, sender, recipient)
    }

    #[test]
    fn mark_read_is_recipient_only() {
        let (mut message, sender, recipient) = sample_direct();
        let now = time::OffsetDateTime::now_utc();

        assert_eq!(
            message.mark_read(sender, now),
            Err(DomainError::NotMessageRecipient)
        );
        assert!(!message.is_read);

        message.mark_read(recipient, now).unwrap();
        assert!(message.is_read);
    }

    #[test]
    fn mark_read_twice_is_idempotent() {
        let (mut message, _, recipient) = sample_direct();
        let now = time::OffsetDateTime::now_utc();

        message.mark_read(recipient, now).unwrap();
        message.mark_read(recipient, now).unwrap();
        assert!(message.is_read);
    }

    #[test]
    fn room_message_cannot_be_marked_read() {
        let now = time::OffsetDateTime::now_utc();
        let sender = UserId::from(Uuid::new_v4());
        let mut message = Message::room(
            MessageId::from(Uuid::new_v4()),
            RoomId::from(Uuid::new_v4()),
            sender,
            MessageContent::new("hi").unwrap(),
            now,
        );
        assert_eq!(
            message.mark_read(sender, now),
            Err(DomainError::NotDirectMessage)
        );
    }

    #[test]
    fn address_accessors_are_exclusive() {
        let (message, _, recipient) = sample_direct();
        assert_eq!(message.recipient_id(), Some(recipient));
        assert_eq!(message.room_id(), None);
    }
}
