//! JWT 认证和授权模块
//!
//! 提供 JWT token 生成、验证，以及请求头中 bearer 凭据的解析。
//! 凭据缺失、格式错误、签名无效或过期一律拒绝，不存在匿名降级。

use axum::http::HeaderMap;
use config::JwtConfig;
use domain::UserId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    expiration_hours: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            expiration_hours: config.expiration_hours,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, user_id: UserId) -> Result<String, ApiError> {
        let exp = time::OffsetDateTime::now_utc() + time::Duration::hours(self.expiration_hours);
        let claims = Claims {
            user_id: user_id.into(),
            exp: exp.unix_timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::internal_server_error(format!("token generation failed: {err}")))
    }

    /// 验证并解析 JWT token，过期与签名错误都视为认证失败
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|_| ApiError::unauthorized("invalid or expired token"))
    }

    /// 从请求头中提取并验证 bearer 凭据
    pub fn extract_user(&self, headers: &HeaderMap) -> Result<UserId, ApiError> {
        let value = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;
        self.verify_bearer(value)
    }

    /// 解析 "Bearer <token>" 形式的凭据：必须恰好两段，scheme 不区分大小写
    pub fn verify_bearer(&self, value: &str) -> Result<UserId, ApiError> {
        let mut parts = value.split_whitespace();
        let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) => (scheme, token),
            _ => return Err(ApiError::unauthorized("malformed authorization header")),
        };
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(ApiError::unauthorized("malformed authorization header"));
        }

        let claims = self.verify_token(token)?;
        Ok(UserId::from(claims.user_id))
    }
}
