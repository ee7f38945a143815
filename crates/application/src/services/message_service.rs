use std::sync::Arc;

use domain::{
    DomainError, Message, MessageContent, MessageId, RoomId, UserId,
};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    events::LiveEvent,
    registry::RoomRegistry,
    repository::{MessageRepository, ParticipantRepository, RoomRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct SendRoomMessageRequest {
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct SendPrivateMessageRequest {
    pub recipient_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub room_repository: Arc<dyn RoomRepository>,
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub registry: Arc<RoomRegistry>,
    pub clock: Arc<dyn Clock>,
}

/// 消息管道：先授权，再持久化，最后实时投递。
/// 持久化失败时不会发生任何投递。
pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn send_room_message(
        &self,
        request: SendRoomMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let room_id = RoomId::from(request.room_id);
        let sender_id = UserId::from(request.sender_id);

        self.deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;
        let member = self
            .deps
            .participant_repository
            .contains(room_id, sender_id)
            .await?;
        if !member {
            return Err(DomainError::NotRoomParticipant.into());
        }

        let sender = self
            .deps
            .user_repository
            .find_by_id(sender_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let content = MessageContent::new(request.content)?;
        let message = Message::room(
            MessageId::from(Uuid::new_v4()),
            room_id,
            sender_id,
            content,
            self.deps.clock.now(),
        );
        let stored = self.deps.message_repository.create(message).await?;

        // 发送者本人也收到回显：投递集合来自持久化结果，不排除任何成员
        let delivered = self
            .deps
            .registry
            .broadcast_room(room_id, LiveEvent::message(&stored, &sender.username), None)
            .await;
        tracing::debug!(
            message_id = %stored.id,
            room_id = %room_id,
            delivered,
            "room message broadcast"
        );

        Ok(stored)
    }

    /// 私聊不要求共同房间成员资格；收件人存在即可。
    pub async fn send_private_message(
        &self,
        request: SendPrivateMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let recipient_id = UserId::from(request.recipient_id);
        let sender_id = UserId::from(request.sender_id);

        self.deps
            .user_repository
            .find_by_id(recipient_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        let sender = self
            .deps
            .user_repository
            .find_by_id(sender_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let content = MessageContent::new(request.content)?;
        let message = Message::direct(
            MessageId::from(Uuid::new_v4()),
            recipient_id,
            sender_id,
            content,
            self.deps.clock.now(),
        );
        let stored = self.deps.message_repository.create(message).await?;

        let delivered = self
            .deps
            .registry
            .send_direct(recipient_id, LiveEvent::message(&stored, &sender.username))
            .await;
        tracing::debug!(
            message_id = %stored.id,
            recipient_id = %recipient_id,
            delivered,
            "private message delivered"
        );

        Ok(stored)
    }

    /// 已读标记：只有收件人可以置位；重复标记幂等成功。
    pub async fn mark_read(
        &self,
        message_id: MessageId,
        reader: UserId,
    ) -> Result<Message, ApplicationError> {
        let mut message = self
            .deps
            .message_repository
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        let already_read = message.is_read;
        message.mark_read(reader, self.deps.clock.now())?;
        if already_read {
            return Ok(message);
        }
        Ok(self.deps.message_repository.update(message).await?)
    }

    pub async fn list_room_messages(
        &self,
        room_id: RoomId,
        reader: UserId,
    ) -> Result<Vec<Message>, ApplicationError> {
        self.deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;
        let member = self
            .deps
            .participant_repository
            .contains(room_id, reader)
            .await?;
        if !member {
            return Err(DomainError::NotRoomParticipant.into());
        }
        Ok(self.deps.message_repository.list_by_room(room_id).await?)
    }

    pub async fn list_private_messages(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.deps.message_repository.list_private_for(user_id).await?)
    }
}
