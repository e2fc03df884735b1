use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use uuid::Uuid;

use super::model::User;
use crate::error::{AppError, AppResult};
use crate::types::RiskLevel;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Fails with `DuplicateEmail` when the email is taken.
    async fn insert(&self, user: &User) -> AppResult<()>;

    /// Returns false when the user no longer exists.
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn update_profile(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: Option<&str>,
        risk_appetite: RiskLevel,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<User>>;
}

#[derive(Clone)]
pub struct UserRepo {
    pub pool: sqlx::Pool<Postgres>,
}

impl UserRepo {
    pub fn new(pool: sqlx::Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, risk_appetite, \
     is_admin, created_at, updated_at";

#[async_trait]
impl UserStore for UserRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"INSERT INTO users (id, first_name, last_name, email, password_hash,
                risk_appetite, is_admin, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.risk_appetite)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = $2
            WHERE id = $3"#,
        )
        .bind(password_hash)
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: Option<&str>,
        risk_appetite: RiskLevel,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = $1, last_name = $2, risk_appetite = $3, updated_at = $4
            WHERE id = $5
            RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(first_name)
        .bind(last_name)
        .bind(risk_appetite)
        .bind(updated_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
