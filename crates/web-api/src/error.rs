use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, RepositoryError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }
}

/// 应用层错误到 (状态码, 稳定错误码) 的映射。
/// WebSocket 错误回执复用同一张表。
pub fn classify(error: &ApplicationError) -> (StatusCode, &'static str) {
    match error {
        ApplicationError::Domain(domain_error) => match domain_error {
            DomainError::InvalidArgument { .. } => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            DomainError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            DomainError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            DomainError::UserAlreadyExists => (StatusCode::CONFLICT, "USER_EXISTS"),
            DomainError::RoomNotFound => (StatusCode::NOT_FOUND, "ROOM_NOT_FOUND"),
            DomainError::MessageNotFound => (StatusCode::NOT_FOUND, "MESSAGE_NOT_FOUND"),
            DomainError::AlreadyParticipant => (StatusCode::CONFLICT, "ALREADY_PARTICIPANT"),
            DomainError::NotParticipant => (StatusCode::BAD_REQUEST, "NOT_PARTICIPANT"),
            DomainError::NotRoomParticipant => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            DomainError::NotMessageRecipient => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            DomainError::NotDirectMessage => (StatusCode::BAD_REQUEST, "NOT_DIRECT_MESSAGE"),
            DomainError::SessionClosed => (StatusCode::BAD_REQUEST, "SESSION_CLOSED"),
        },
        ApplicationError::Repository(repository_error) => match repository_error {
            RepositoryError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            RepositoryError::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            RepositoryError::Storage { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
        },
        ApplicationError::Password(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PASSWORD_ERROR"),
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let (status, code) = classify(&error);
        let message = match &error {
            // 存储细节不外泄
            ApplicationError::Repository(RepositoryError::Storage { .. }) => {
                tracing::error!(error = %error, "storage failure");
                "internal storage failure".to_string()
            }
            ApplicationError::Password(err) => {
                tracing::error!(error = %err, "password hashing failure");
                "internal failure".to_string()
            }
            other => other.to_string(),
        };
        ApiError::new(status, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
