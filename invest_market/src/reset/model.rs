use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::constant::{RESET_CODE_MAX, RESET_CODE_MIN};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn issue(email: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            token: generate_code(),
            expires_at: now + ttl,
            is_used: false,
            created_at: now,
        }
    }

    /// Live means unused and strictly before expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.expires_at > now
    }
}

pub fn generate_code() -> String {
    rand::thread_rng()
        .gen_range(RESET_CODE_MIN..=RESET_CODE_MAX)
        .to_string()
}
