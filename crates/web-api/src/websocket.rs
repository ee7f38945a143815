//! WebSocket 实时通道。
//!
//! 握手时验证 bearer 凭据，未认证的连接不会进入服务；
//! 连接断开时会话被立即从注册表移除，在线标记尽力清除。
//! 客户端事件统一经 `handle_client_event` 按种类分发。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use application::services::SendRoomMessageRequest;
use application::{ApplicationError, LiveEvent};
use domain::{DomainError, RoomId, SessionId, UserId};

use crate::{
    error::{classify, ApiError},
    state::AppState,
};

/// WebSocket连接查询参数
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token
    pub token: String,
}

/// 客户端上行事件
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom { room_id: Uuid },
    LeaveRoom { room_id: Uuid },
    SendMessage { room_id: Uuid, content: String },
    Typing { room_id: Uuid, is_typing: bool },
}

/// 处理WebSocket连接升级：认证失败直接拒绝，不存在匿名会话
pub async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let claims = state.jwt_service.verify_token(&query.token)?;
    let user_id = UserId::from(claims.user_id);
    // 凭据有效但用户不存在同样拒绝
    state
        .user_service
        .profile(user_id)
        .await
        .map_err(|_| ApiError::unauthorized("unknown user"))?;

    tracing::info!(user_id = %user_id, "websocket upgrade");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let live = state.registry.register(user_id).await;
    let session_id = live.session_id;
    let mut events = live.events;

    let (mut sender, mut incoming) = socket.split();

    // 发送任务：顺序排空会话通道；慢连接只拖慢自己的队列
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize live event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // 接收任务：解析并分发客户端事件
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = incoming.next().await {
            match message {
                WsMessage::Text(text) => {
                    let outcome = match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            handle_client_event(&recv_state, session_id, user_id, event).await
                        }
                        Err(err) => {
                            let feedback =
                                LiveEvent::error("BAD_EVENT", format!("unparseable event: {err}"));
                            recv_state
                                .registry
                                .send_to_session(session_id, feedback)
                                .await
                        }
                    };
                    if outcome.is_err() {
                        // 会话已销毁，终止接收
                        break;
                    }
                }
                WsMessage::Close(_) => break,
                // Ping/Pong 由协议栈处理
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // 断开即清理：会话从所有房间条目移除，之后的广播不再包含它
    match state.registry.unregister(session_id).await {
        Ok(joined_rooms) => {
            for room_id in joined_rooms {
                state
                    .registry
                    .broadcast_room(
                        room_id,
                        LiveEvent::UserLeft {
                            room_id: room_id.into(),
                            user_id: user_id.into(),
                        },
                        None,
                    )
                    .await;
            }
        }
        Err(err) => {
            tracing::debug!(session_id = %session_id, error = %err, "session already gone");
        }
    }

    if let Err(err) = state.user_service.mark_offline(user_id).await {
        tracing::warn!(error = %err, user_id = %user_id, "failed to clear online flag");
    }

    tracing::info!(session_id = %session_id, user_id = %user_id, "websocket disconnected");
}

/// 按事件种类分发。返回 `Err` 仅表示会话已关闭，调用方应停止读取；
/// 业务失败通过错误回执事件反馈给客户端，不中断连接。
async fn handle_client_event(
    state: &AppState,
    session_id: SessionId,
    user_id: UserId,
    event: ClientEvent,
) -> Result<(), DomainError> {
    match event {
        ClientEvent::JoinRoom { room_id } => {
            let room_id = RoomId::from(room_id);
            // 实时加入之前必须通过持久成员资格授权
            if let Err(err) = state.room_service.ensure_participant(user_id, room_id).await {
                return reject(state, session_id, &err).await;
            }
            let newly_joined = state.registry.join(session_id, room_id).await?;
            if newly_joined {
                state
                    .registry
                    .broadcast_room(
                        room_id,
                        LiveEvent::UserJoined {
                            room_id: room_id.into(),
                            user_id: user_id.into(),
                        },
                        Some(session_id),
                    )
                    .await;
            }
            Ok(())
        }
        ClientEvent::LeaveRoom { room_id } => {
            let room_id = RoomId::from(room_id);
            state.registry.leave(session_id, room_id).await?;
            state
                .registry
                .broadcast_room(
                    room_id,
                    LiveEvent::UserLeft {
                        room_id: room_id.into(),
                        user_id: user_id.into(),
                    },
                    Some(session_id),
                )
                .await;
            Ok(())
        }
        ClientEvent::SendMessage { room_id, content } => {
            // 授权、持久化与广播都在消息管道内完成
            let result = state
                .message_service
                .send_room_message(SendRoomMessageRequest {
                    room_id,
                    sender_id: user_id.into(),
                    content,
                })
                .await;
            if let Err(err) = result {
                return reject(state, session_id, &err).await;
            }
            Ok(())
        }
        ClientEvent::Typing { room_id, is_typing } => {
            let room_id = RoomId::from(room_id);
            if !state.registry.is_joined(session_id, room_id).await {
                let feedback = LiveEvent::error("FORBIDDEN", "join the room before typing");
                return state.registry.send_to_session(session_id, feedback).await;
            }
            state
                .registry
                .broadcast_room(
                    room_id,
                    LiveEvent::Typing {
                        room_id: room_id.into(),
                        user_id: user_id.into(),
                        is_typing,
                    },
                    Some(session_id),
                )
                .await;
            Ok(())
        }
    }
}

async fn reject(
    state: &AppState,
    session_id: SessionId,
    error: &ApplicationError,
) -> Result<(), DomainError> {
    let (_, code) = classify(error);
    state
        .registry
        .send_to_session(session_id, LiveEvent::error(code, error.to_string()))
        .await
}
