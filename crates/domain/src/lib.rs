//! 聊天系统核心领域模型
//!
//! 包含用户、房间、消息等核心实体，以及成员资格相关的业务规则。

pub mod errors;
pub mod message;
pub mod participant;
pub mod room;
pub mod user;
pub mod value_objects;

pub use errors::*;
pub use message::*;
pub use participant::*;
pub use room::*;
pub use user::*;
pub use value_objects::*;
