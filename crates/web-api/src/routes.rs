use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::services::{
    AuthenticateUserRequest, CreateRoomRequest, RegisterUserRequest, SendPrivateMessageRequest,
    SendRoomMessageRequest,
};
use application::{MessageDto, RoomDetailDto, RoomDto, UserDto};
use domain::{MessageId, RoomId};

use crate::{error::ApiError, state::AppState, websocket};

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: UserDto,
}

#[derive(Debug, Deserialize)]
struct CreateRoomPayload {
    name: String,
    description: Option<String>,
    #[serde(default)]
    is_private: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    content: String,
    room_id: Option<Uuid>,
    recipient_id: Option<Uuid>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .route("/ws", get(websocket::websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register_user))
        .route("/users/login", post(login_user))
        .route("/users/me", get(get_me))
        .route("/users/logout", post(logout_user))
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/{id}", get(get_room))
        .route("/rooms/{id}/join", post(join_room))
        .route("/rooms/{id}/leave", post(leave_room))
        .route("/messages", post(send_message))
        .route("/messages/room/{room_id}", get(list_room_messages))
        .route("/messages/private", get(list_private_messages))
        .route("/messages/{message_id}/read", patch(mark_message_read))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserDto::from(&user),
        }),
    ))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: UserDto::from(&user),
    }))
}

async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    let user = state.user_service.profile(user_id).await?;
    Ok(Json(UserDto::from(&user)))
}

async fn logout_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    state.user_service.mark_offline(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<RoomDto>), ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    let room = state
        .room_service
        .create_room(CreateRoomRequest {
            name: payload.name,
            description: payload.description,
            is_private: payload.is_private,
            creator_id: user_id.into(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RoomDto::from(&room))))
}

async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    state.jwt_service.extract_user(&headers)?;
    let rooms = state.room_service.list_public_rooms().await?;
    Ok(Json(rooms.iter().map(RoomDto::from).collect()))
}

async fn get_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    state.jwt_service.extract_user(&headers)?;
    let (room, participants) = state.room_service.get_room(RoomId::from(id)).await?;
    Ok(Json(RoomDetailDto::new(&room, &participants)))
}

async fn join_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    state.room_service.join(RoomId::from(id), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn leave_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    state.room_service.leave(RoomId::from(id), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;

    // 房间消息与私聊消息二选一
    let message = match (payload.room_id, payload.recipient_id) {
        (Some(room_id), None) => {
            state
                .message_service
                .send_room_message(SendRoomMessageRequest {
                    room_id,
                    sender_id: user_id.into(),
                    content: payload.content,
                })
                .await?
        }
        (None, Some(recipient_id)) => {
            state
                .message_service
                .send_private_message(SendPrivateMessageRequest {
                    recipient_id,
                    sender_id: user_id.into(),
                    content: payload.content,
                })
                .await?
        }
        _ => {
            return Err(ApiError::bad_request(
                "exactly one of room_id and recipient_id is required",
            ))
        }
    };

    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

async fn list_room_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    let messages = state
        .message_service
        .list_room_messages(RoomId::from(room_id), user_id)
        .await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

async fn list_private_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    let messages = state.message_service.list_private_messages(user_id).await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

async fn mark_message_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageDto>, ApiError> {
    let user_id = state.jwt_service.extract_user(&headers)?;
    let message = state
        .message_service
        .mark_read(MessageId::from(message_id), user_id)
        .await?;
    Ok(Json(MessageDto::from(&message)))
}
