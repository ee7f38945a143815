//! 主应用程序入口
//!
//! 装配存储、服务与注册表，启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    services::{
        MessageService, MessageServiceDependencies, RoomService, RoomServiceDependencies,
        UserService, UserServiceDependencies,
    },
    RoomRegistry, SystemClock,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, BcryptPasswordHasher, PgMessageRepository, PgParticipantRepository,
    PgRoomRepository, PgUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );
    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    let user_repository = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let room_repository = Arc::new(PgRoomRepository::new(pg_pool.clone()));
    let participant_repository = Arc::new(PgParticipantRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool));

    let password_hasher = Arc::new(BcryptPasswordHasher::new(config.server.bcrypt_cost));
    let clock = Arc::new(SystemClock);

    // 房间注册表：每个进程一个，显式注入到需要它的服务
    let registry = Arc::new(RoomRegistry::new());

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    }));
    let room_service = Arc::new(RoomService::new(RoomServiceDependencies {
        room_repository: room_repository.clone(),
        participant_repository: participant_repository.clone(),
        registry: registry.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository,
        room_repository,
        participant_repository,
        user_repository,
        registry: registry.clone(),
        clock,
    }));

    let jwt_service = Arc::new(JwtService::new(&config.jwt));

    let state = AppState::new(
        user_service,
        room_service,
        message_service,
        registry,
        jwt_service,
    );

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
