use async_trait::async_trait;
use sqlx::Postgres;

use super::model::TransactionRecord;
use crate::error::AppResult;

#[async_trait]
pub trait TxLogStore: Send + Sync {
    async fn insert(&self, record: &TransactionRecord) -> AppResult<()>;

    /// Most recent records first.
    async fn recent(&self, limit: usize) -> AppResult<Vec<TransactionRecord>>;
}

#[derive(Clone)]
pub struct TxLogRepo {
    pub pool: sqlx::Pool<Postgres>,
}

impl TxLogRepo {
    pub fn new(pool: sqlx::Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TxLogStore for TxLogRepo {
    async fn insert(&self, record: &TransactionRecord) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO transaction_logs (id, user_id, method, path, status,
                error_code, duration_ms, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.method)
        .bind(&record.path)
        .bind(record.status)
        .bind(&record.error_code)
        .bind(record.duration_ms)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AppResult<Vec<TransactionRecord>> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"SELECT id, user_id, method, path, status, error_code, duration_ms, created_at
                FROM transaction_logs
                ORDER BY created_at DESC
                LIMIT $1"#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
