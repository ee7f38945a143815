//! 基础设施层：Postgres 仓库实现与密码哈希适配器。

pub mod password;
pub mod postgres;

pub use password::BcryptPasswordHasher;
pub use postgres::{
    create_pg_pool, PgMessageRepository, PgParticipantRepository, PgRoomRepository,
    PgUserRepository,
};
