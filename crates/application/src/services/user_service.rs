use std::sync::Arc;

use domain::{DomainError, RepositoryError, User, UserEmail, UserId, Username};
use uuid::Uuid;

use crate::{
    clock::Clock, error::ApplicationError, password::PasswordHasher, repository::UserRepository,
};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub email: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        let email = UserEmail::parse(request.email)?;

        let username_taken = self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .is_some();
        let email_taken = self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .is_some();
        if username_taken || email_taken {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password = self.deps.password_hasher.hash(&request.password).await?;
        let now = self.deps.clock.now();
        let user = User::register(UserId::from(Uuid::new_v4()), username, email, password, now);

        match self.deps.user_repository.create(user).await {
            Ok(created) => Ok(created),
            // 并发注册撞上唯一约束时与预检查同样归为“已存在”
            Err(RepositoryError::Conflict) => Err(DomainError::UserAlreadyExists.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// 校验凭据并置为在线。邮箱不存在与密码错误不可区分。
    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let email =
            UserEmail::parse(request.email).map_err(|_| DomainError::InvalidCredentials)?;

        let Some(mut user) = self.deps.user_repository.find_by_email(&email).await? else {
            return Err(DomainError::InvalidCredentials.into());
        };

        let valid = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !valid {
            return Err(DomainError::InvalidCredentials.into());
        }

        user.set_online(true, self.deps.clock.now());
        Ok(self.deps.user_repository.update(user).await?)
    }

    pub async fn profile(&self, user_id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    /// 清除尽力而为的在线标记，登出和连接断开共用。
    pub async fn mark_offline(&self, user_id: UserId) -> Result<(), ApplicationError> {
        let mut user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        user.set_online(false, self.deps.clock.now());
        self.deps.user_repository.update(user).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestEnv;

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let env = TestEnv::new();

        let user = env
            .user_service
            .register(RegisterUserRequest {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password: "s3cret".into(),
            })
            .await
            .unwrap();
        assert!(!user.is_online);

        let logged_in = env
            .user_service
            .authenticate(AuthenticateUserRequest {
                email: "alice@example.com".into(),
                password: "s3cret".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(logged_in.is_online);
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected() {
        let env = TestEnv::new();
        env.register_user("alice", "alice@example.com").await;

        let same_username = env
            .user_service
            .register(RegisterUserRequest {
                username: "alice".into(),
                email: "other@example.com".into(),
                password: "pw".into(),
            })
            .await;
        assert!(matches!(
            same_username,
            Err(ApplicationError::Domain(DomainError::UserAlreadyExists))
        ));

        let same_email = env
            .user_service
            .register(RegisterUserRequest {
                username: "bob".into(),
                email: "alice@example.com".into(),
                password: "pw".into(),
            })
            .await;
        assert!(matches!(
            same_email,
            Err(ApplicationError::Domain(DomainError::UserAlreadyExists))
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let env = TestEnv::new();
        env.register_user("alice", "alice@example.com").await;

        let wrong_password = env
            .user_service
            .authenticate(AuthenticateUserRequest {
                email: "alice@example.com".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();
        let unknown_email = env
            .user_service
            .authenticate(AuthenticateUserRequest {
                email: "ghost@example.com".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            wrong_password,
            ApplicationError::Domain(DomainError::InvalidCredentials)
        ));
        assert!(matches!(
            unknown_email,
            ApplicationError::Domain(DomainError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn mark_offline_clears_the_flag() {
        let env = TestEnv::new();
        let user = env.register_user("alice", "alice@example.com").await;

        env.user_service
            .authenticate(AuthenticateUserRequest {
                email: "alice@example.com".into(),
                password: TestEnv::DEFAULT_PASSWORD.into(),
            })
            .await
            .unwrap();

        env.user_service.mark_offline(user.id).await.unwrap();
        let profile = env.user_service.profile(user.id).await.unwrap();
        assert!(!profile.is_online);
    }
}
