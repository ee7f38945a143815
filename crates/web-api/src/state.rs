use std::sync::Arc;

use application::{MessageService, RoomRegistry, RoomService, UserService};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub room_service: Arc<RoomService>,
    pub message_service: Arc<MessageService>,
    pub registry: Arc<RoomRegistry>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        room_service: Arc<RoomService>,
        message_service: Arc<MessageService>,
        registry: Arc<RoomRegistry>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            user_service,
            room_service,
            message_service,
            registry,
            jwt_service,
        }
    }
}
