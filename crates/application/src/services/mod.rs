pub mod message_service;
pub mod room_service;
pub mod user_service;

pub use message_service::{
    MessageService, MessageServiceDependencies, SendPrivateMessageRequest, SendRoomMessageRequest,
};
pub use room_service::{CreateRoomRequest, RoomService, RoomServiceDependencies};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, UserService, UserServiceDependencies,
};

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod scenario_tests;
