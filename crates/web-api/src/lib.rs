//! Web API 层：REST 路由、WebSocket 实时通道、JWT 认证与错误映射。

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use auth::{Claims, JwtService};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
