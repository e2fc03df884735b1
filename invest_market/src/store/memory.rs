use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::investment::model::{Investment, InvestmentDetail};
use crate::investment::repo::{BuildInvestment, InvestmentStore};
use crate::product::model::InvestmentProduct;
use crate::product::repo::ProductStore;
use crate::reset::model::PasswordResetToken;
use crate::reset::repo::ResetTokenStore;
use crate::txlog::model::TransactionRecord;
use crate::txlog::repo::TxLogStore;
use crate::types::RiskLevel;
use crate::user::model::User;
use crate::user::repo::UserStore;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    reset_tokens: Vec<PasswordResetToken>,
    products: Vec<InvestmentProduct>,
    investments: Vec<Investment>,
    txlog: Vec<TransactionRecord>,
}

/// Process-local backend behind the same store traits as Postgres.
///
/// Every write takes the table lock for its whole read-check-write.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn investment_count(&self) -> usize {
        self.tables.read().await.investments.len()
    }

    pub async fn reset_tokens_for(&self, email: &str) -> Vec<PasswordResetToken> {
        self.tables
            .read()
            .await
            .reset_tokens
            .iter()
            .filter(|t| t.email == email)
            .cloned()
            .collect()
    }
}

fn detail(tables: &Tables, investment: &Investment) -> Option<InvestmentDetail> {
    tables
        .products
        .iter()
        .find(|p| p.id == investment.product_id)
        .map(|product| InvestmentDetail {
            investment: investment.clone(),
            product: product.summary(),
        })
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateEmail);
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: Option<&str>,
        risk_appetite: RiskLevel,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.first_name = first_name.to_string();
            user.last_name = last_name.map(str::to_string);
            user.risk_appetite = risk_appetite;
            user.updated_at = updated_at;
            user.clone()
        }))
    }
}

#[async_trait]
impl ResetTokenStore for MemoryStore {
    async fn insert(&self, token: &PasswordResetToken) -> AppResult<()> {
        self.tables.write().await.reset_tokens.push(token.clone());
        Ok(())
    }

    async fn find_live(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PasswordResetToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_tokens
            .iter()
            .rev()
            .find(|t| t.email == email && t.token == code && t.is_live(now))
            .cloned())
    }

    async fn mark_used(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .reset_tokens
            .iter_mut()
            .find(|t| t.id == id && !t.is_used)
        {
            Some(token) => {
                token.is_used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<InvestmentProduct>> {
        let tables = self.tables.read().await;
        let mut products: Vec<InvestmentProduct> = tables.products.iter().rev().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InvestmentProduct>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, product: &InvestmentProduct) -> AppResult<()> {
        self.tables.write().await.products.push(product.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.investments.iter().any(|i| i.product_id == id) {
            return Err(AppError::ProductInUse);
        }
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        Ok(tables.products.len() != before)
    }
}

#[async_trait]
impl InvestmentStore for MemoryStore {
    async fn create_checked(
        &self,
        product_id: Uuid,
        build: &BuildInvestment,
    ) -> AppResult<(Investment, InvestmentProduct)> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or(AppError::ProductNotFound)?;
        let investment = build(&product)?;
        tables.investments.push(investment.clone());
        Ok((investment, product))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<InvestmentDetail>> {
        let tables = self.tables.read().await;
        let mut details: Vec<InvestmentDetail> = tables
            .investments
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .filter_map(|i| detail(&tables, i))
            .collect();
        details.sort_by(|a, b| b.investment.invested_at.cmp(&a.investment.invested_at));
        Ok(details)
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<InvestmentDetail>> {
        let tables = self.tables.read().await;
        Ok(tables
            .investments
            .iter()
            .find(|i| i.id == id && i.user_id == user_id)
            .and_then(|i| detail(&tables, i)))
    }
}

#[async_trait]
impl TxLogStore for MemoryStore {
    async fn insert(&self, record: &TransactionRecord) -> AppResult<()> {
        self.tables.write().await.txlog.push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AppResult<Vec<TransactionRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.txlog.iter().rev().take(limit).cloned().collect())
    }
}
