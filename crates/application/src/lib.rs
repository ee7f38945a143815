//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：成员资格授权、消息管道、
//! 以及进程内的房间注册表（实时投递的核心），并定义对外部适配器
//! （存储、密码哈希、时钟）的抽象。

pub mod clock;
pub mod dto;
pub mod error;
pub mod events;
pub mod memory;
pub mod password;
pub mod registry;
pub mod repository;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use dto::{MessageDto, RoomDetailDto, RoomDto, UserDto};
pub use error::ApplicationError;
pub use events::LiveEvent;
pub use password::{PasswordHasher, PasswordHasherError};
pub use registry::{LiveSession, RoomRegistry};
pub use repository::{
    MessageRepository, ParticipantRepository, RoomRepository, UserRepository,
};
pub use services::{
    MessageService, MessageServiceDependencies, RoomService, RoomServiceDependencies, UserService,
    UserServiceDependencies,
};
