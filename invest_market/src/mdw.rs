use auth_validate::jwt::{Claims, JwtKeys, Role, verify_jwt};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::req::Request;
use crate::utils::extract_token;

pub struct Middleware {}

impl Middleware {
    /// Verifies the bearer token on a request; expiry is judged at `now`.
    pub fn authenticate(
        request: &Request,
        keys: &JwtKeys,
        now: DateTime<Utc>,
    ) -> AppResult<Claims> {
        let token = extract_token(&request.headers).ok_or(AppError::Unauthenticated)?;
        verify_jwt(&token, keys, now).map_err(|e| {
            debug!("token rejected: {}", e);
            AppError::Unauthenticated
        })
    }

    pub fn user_id(claims: &Claims) -> AppResult<Uuid> {
        Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)
    }
}

pub fn require_role(claims: &Claims, role: Role) -> AppResult<()> {
    if claims.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
