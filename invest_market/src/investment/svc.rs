use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::model::{Investment, InvestmentDetail, InvestmentForm, check_bounds};
use super::repo::InvestmentStore;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::portfolio::model::{Portfolio, summarize};

#[derive(Clone)]
pub struct InvestmentService {
    investments: Arc<dyn InvestmentStore>,
    clock: Arc<dyn Clock>,
}

impl InvestmentService {
    pub fn new(investments: Arc<dyn InvestmentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { investments, clock }
    }

    /// The response carries the product as read at creation time.
    pub async fn create(&self, user_id: Uuid, form: InvestmentForm) -> AppResult<InvestmentDetail> {
        form.validate()?;
        let amount = form.amount;
        let now = self.clock.now();

        let (investment, product) = self
            .investments
            .create_checked(form.product_id, &move |product| {
                check_bounds(amount, product)?;
                Investment::open(user_id, product, amount, now)
            })
            .await?;

        info!(
            user_id = %user_id,
            investment_id = %investment.id,
            product_id = %product.id,
            amount = %investment.amount,
            "investment created"
        );
        Ok(InvestmentDetail {
            investment,
            product: product.summary(),
        })
    }

    pub async fn portfolio(&self, user_id: Uuid) -> AppResult<Portfolio> {
        let investments = self.investments.list_for_user(user_id).await?;
        let summary = summarize(&investments);
        Ok(Portfolio {
            investments,
            portfolio: summary,
        })
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<InvestmentDetail> {
        self.investments
            .find_for_user(user_id, id)
            .await?
            .ok_or(AppError::InvestmentNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::memory::MemoryStore;
    use crate::testkit::{product, seed};
    use crate::types::{InvestmentStatus, InvestmentType, RiskLevel};
    use crate::utils::des_from_str;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use rust_decimal::{Decimal, dec};

    fn service() -> (InvestmentService, Arc<MemoryStore>, Arc<FixedClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap()));
        (
            InvestmentService::new(store.clone(), clock.clone()),
            store,
            clock,
        )
    }

    fn form(product_id: Uuid, amount: Decimal) -> InvestmentForm {
        InvestmentForm { product_id, amount }
    }

    #[tokio::test]
    async fn creates_priced_investment_with_snapshot() {
        let (svc, store, _) = service();
        let p = product(dec!(8.5), 24, RiskLevel::Low, InvestmentType::Bond, dec!(1000), None);
        seed(&store, &p).await;
        let user = Uuid::new_v4();

        let detail = svc.create(user, form(p.id, dec!(50000))).await.unwrap();
        assert_eq!(detail.investment.expected_return, Some(dec!(8500.00)));
        assert_eq!(detail.investment.status, InvestmentStatus::Active);
        assert_eq!(detail.investment.user_id, user);
        assert_eq!(detail.investment.maturity_date, NaiveDate::from_ymd_opt(2027, 1, 31));
        assert_eq!(detail.product, p.summary());
    }

    #[tokio::test]
    async fn month_end_maturity_is_clamped() {
        let (svc, store, _) = service();
        let p = product(dec!(6), 1, RiskLevel::Low, InvestmentType::Fd, dec!(1000), None);
        seed(&store, &p).await;
        let detail = svc.create(Uuid::new_v4(), form(p.id, dec!(1000))).await.unwrap();
        assert_eq!(detail.investment.maturity_date, NaiveDate::from_ymd_opt(2025, 2, 28));
    }

    #[tokio::test]
    async fn minimum_is_inclusive() {
        let (svc, store, _) = service();
        let p = product(dec!(7), 12, RiskLevel::Moderate, InvestmentType::Mf, dec!(5000), None);
        seed(&store, &p).await;
        let user = Uuid::new_v4();

        assert!(svc.create(user, form(p.id, dec!(5000))).await.is_ok());
        let err = svc.create(user, form(p.id, dec!(4999.99))).await.unwrap_err();
        assert!(matches!(err, AppError::BelowMinimum { .. }));
        assert_eq!(store.investment_count().await, 1);
    }

    #[tokio::test]
    async fn maximum_is_enforced_when_set() {
        let (svc, store, _) = service();
        let p = product(dec!(7), 12, RiskLevel::High, InvestmentType::Etf, dec!(1000), Some(dec!(20000)));
        seed(&store, &p).await;
        let err = svc
            .create(Uuid::new_v4(), form(p.id, dec!(20000.01)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AboveMaximum { .. }));
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn unbounded_product_accepts_huge_amount() {
        let (svc, store, _) = service();
        let p = product(dec!(7), 12, RiskLevel::High, InvestmentType::Etf, dec!(1000), None);
        seed(&store, &p).await;
        assert!(svc
            .create(Uuid::new_v4(), form(p.id, dec!(1000000000)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn amount_beyond_money_column_is_a_validation_error() {
        let (svc, store, _) = service();
        let p = product(dec!(8.5), 120, RiskLevel::High, InvestmentType::Bond, dec!(1000), None);
        seed(&store, &p).await;
        let user = Uuid::new_v4();

        let huge: InvestmentForm =
            des_from_str(&format!(r#"{{"productId":"{}","amount":1e27}}"#, p.id)).unwrap();
        let err = svc.create(user, huge).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.status(), 400);

        let err = svc.create(user, form(p.id, dec!(1000.005))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let largest = svc.create(user, form(p.id, dec!(9999999999999.99))).await.unwrap();
        assert_eq!(
            largest.investment.expected_return,
            Some(dec!(8499999999999.99))
        );
        assert_eq!(store.investment_count().await, 1);
    }

    #[tokio::test]
    async fn global_floor_applies_even_below_product_minimum() {
        let (svc, store, _) = service();
        let p = product(dec!(7), 12, RiskLevel::High, InvestmentType::Other, dec!(100), None);
        seed(&store, &p).await;
        let err = svc.create(Uuid::new_v4(), form(p.id, dec!(500))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (svc, _, _) = service();
        let err = svc
            .create(Uuid::new_v4(), form(Uuid::new_v4(), dec!(1000)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound));
    }

    #[tokio::test]
    async fn portfolio_lists_newest_first_and_is_stable() {
        let (svc, store, clock) = service();
        let low = product(dec!(6), 12, RiskLevel::Low, InvestmentType::Fd, dec!(1000), None);
        let high = product(dec!(10), 12, RiskLevel::High, InvestmentType::Etf, dec!(1000), None);
        seed(&store, &low).await;
        seed(&store, &high).await;
        let user = Uuid::new_v4();

        svc.create(user, form(low.id, dec!(1000))).await.unwrap();
        clock.advance(Duration::hours(1));
        let newest = svc.create(user, form(high.id, dec!(2000))).await.unwrap();
        svc.create(Uuid::new_v4(), form(high.id, dec!(9000))).await.unwrap();

        let first = svc.portfolio(user).await.unwrap();
        assert_eq!(first.investments.len(), 2);
        assert_eq!(first.investments[0].investment.id, newest.investment.id);
        assert_eq!(first.portfolio.total_invested, dec!(3000));
        assert_eq!(first.portfolio.risk_distribution.len(), 2);
        assert_eq!(first.portfolio.risk_distribution.total(), dec!(3000));
        assert_eq!(first.portfolio.active_investments, 2);
        assert_eq!(first.portfolio.average_yield, dec!(8));

        let second = svc.portfolio(user).await.unwrap();
        assert_eq!(first.portfolio, second.portfolio);
    }

    #[tokio::test]
    async fn other_users_investment_is_hidden() {
        let (svc, store, _) = service();
        let p = product(dec!(6), 12, RiskLevel::Low, InvestmentType::Fd, dec!(1000), None);
        seed(&store, &p).await;
        let owner = Uuid::new_v4();
        let created = svc.create(owner, form(p.id, dec!(1000))).await.unwrap();

        assert!(svc.get(owner, created.investment.id).await.is_ok());
        assert!(matches!(
            svc.get(Uuid::new_v4(), created.investment.id).await,
            Err(AppError::InvestmentNotFound)
        ));
    }

    #[tokio::test]
    async fn concurrent_creates_are_not_deduplicated() {
        let (svc, store, _) = service();
        let p = product(dec!(6), 12, RiskLevel::Low, InvestmentType::Fd, dec!(1000), Some(dec!(1000)));
        seed(&store, &p).await;
        let user = Uuid::new_v4();
        let (a, b) = tokio::join!(
            svc.create(user, form(p.id, dec!(1000))),
            svc.create(user, form(p.id, dec!(1000))),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(store.investment_count().await, 2);
    }
}
