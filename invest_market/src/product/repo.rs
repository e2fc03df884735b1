use async_trait::async_trait;
use sqlx::Postgres;
use uuid::Uuid;

use super::model::InvestmentProduct;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<InvestmentProduct>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InvestmentProduct>>;

    async fn insert(&self, product: &InvestmentProduct) -> AppResult<()>;

    /// Returns false when nothing was deleted; `ProductInUse` when referenced.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct ProductRepository {
    pub pool: sqlx::Pool<Postgres>,
}

impl ProductRepository {
    pub fn new(pool: sqlx::Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, investment_type, tenure_months, annual_yield, risk_level, \
     min_investment, max_investment, description, created_at, updated_at";

#[async_trait]
impl ProductStore for ProductRepository {
    async fn list(&self) -> AppResult<Vec<InvestmentProduct>> {
        let products = sqlx::query_as::<_, InvestmentProduct>(&format!(
            "SELECT {} FROM investment_products ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InvestmentProduct>> {
        let product = sqlx::query_as::<_, InvestmentProduct>(&format!(
            "SELECT {} FROM investment_products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn insert(&self, product: &InvestmentProduct) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO investment_products (id, name, investment_type, tenure_months,
                annual_yield, risk_level, min_investment, max_investment, description,
                created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.investment_type)
        .bind(product.tenure_months)
        .bind(product.annual_yield)
        .bind(product.risk_level)
        .bind(product.min_investment)
        .bind(product.max_investment)
        .bind(&product.description)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM investment_products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(AppError::ProductInUse)
            }
            Err(e) => Err(e.into()),
        }
    }
}
