use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use uuid::Uuid;

use super::model::PasswordResetToken;
use crate::error::AppResult;

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn insert(&self, token: &PasswordResetToken) -> AppResult<()>;

    /// Newest live token matching email and code.
    async fn find_live(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PasswordResetToken>>;

    /// Compare-and-set on `is_used`; false when another caller won.
    async fn mark_used(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct ResetTokenRepo {
    pub pool: sqlx::Pool<Postgres>,
}

impl ResetTokenRepo {
    pub fn new(pool: sqlx::Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for ResetTokenRepo {
    async fn insert(&self, token: &PasswordResetToken) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO password_reset_tokens (id, email, token, expires_at, is_used, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(token.id)
        .bind(&token.email)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.is_used)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_live(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PasswordResetToken>> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"SELECT id, email, token, expires_at, is_used, created_at
                FROM password_reset_tokens
                WHERE email = $1 AND token = $2 AND is_used = FALSE AND expires_at > $3
                ORDER BY created_at DESC
                LIMIT 1"#,
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn mark_used(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET is_used = TRUE
            WHERE id = $1 AND is_used = FALSE"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
