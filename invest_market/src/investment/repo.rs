use async_trait::async_trait;
use sqlx::Postgres;
use uuid::Uuid;

use super::model::{Investment, InvestmentDetail, InvestmentRow};
use crate::error::{AppError, AppResult};
use crate::product::model::InvestmentProduct;

/// Builds the record to insert from the product as read inside the write unit.
pub type BuildInvestment = dyn Fn(&InvestmentProduct) -> AppResult<Investment> + Send + Sync;

#[async_trait]
pub trait InvestmentStore: Send + Sync {
    /// Reads the product, builds and inserts the investment as one unit.
    async fn create_checked(
        &self,
        product_id: Uuid,
        build: &BuildInvestment,
    ) -> AppResult<(Investment, InvestmentProduct)>;

    /// Newest first, joined with the live product row.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<InvestmentDetail>>;

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<InvestmentDetail>>;
}

#[derive(Clone)]
pub struct InvestmentRepo {
    pub pool: sqlx::Pool<Postgres>,
}

impl InvestmentRepo {
    pub fn new(pool: sqlx::Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const DETAIL_SELECT: &str = r#"SELECT i.id, i.user_id, i.product_id, i.amount, i.invested_at,
        i.status, i.expected_return, i.maturity_date,
        p.name AS product_name, p.investment_type, p.annual_yield, p.risk_level, p.tenure_months
    FROM investments i
    JOIN investment_products p ON p.id = i.product_id"#;

#[async_trait]
impl InvestmentStore for InvestmentRepo {
    async fn create_checked(
        &self,
        product_id: Uuid,
        build: &BuildInvestment,
    ) -> AppResult<(Investment, InvestmentProduct)> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let product = sqlx::query_as::<_, InvestmentProduct>(
            r#"SELECT id, name, investment_type, tenure_months, annual_yield, risk_level,
                min_investment, max_investment, description, created_at, updated_at
                FROM investment_products WHERE id = $1 FOR SHARE"#,
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::ProductNotFound)?;

        let investment = build(&product)?;

        sqlx::query(
            r#"INSERT INTO investments (id, user_id, product_id, amount, invested_at,
                status, expected_return, maturity_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(investment.id)
        .bind(investment.user_id)
        .bind(investment.product_id)
        .bind(investment.amount)
        .bind(investment.invested_at)
        .bind(investment.status)
        .bind(investment.expected_return)
        .bind(investment.maturity_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((investment, product))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<InvestmentDetail>> {
        let rows = sqlx::query_as::<_, InvestmentRow>(&format!(
            "{} WHERE i.user_id = $1 ORDER BY i.invested_at DESC",
            DETAIL_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(InvestmentDetail::from).collect())
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<InvestmentDetail>> {
        let row = sqlx::query_as::<_, InvestmentRow>(&format!(
            "{} WHERE i.user_id = $1 AND i.id = $2",
            DETAIL_SELECT
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(InvestmentDetail::from))
    }
}
