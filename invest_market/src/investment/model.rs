use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::constant::{MAX_MONEY, MIN_INVESTMENT_FLOOR};
use crate::error::{AppError, AppResult, FieldError};
use crate::product::model::{InvestmentProduct, ProductSummary};
use crate::types::{InvestmentStatus, InvestmentType, RiskLevel};
use crate::utils::has_money_scale;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub amount: Decimal,
    pub invested_at: DateTime<Utc>,
    pub status: InvestmentStatus,
    pub expected_return: Option<Decimal>,
    pub maturity_date: Option<NaiveDate>,
}

impl Investment {
    /// Prices a new active investment against `product` at `now`.
    pub fn open(
        user_id: Uuid,
        product: &InvestmentProduct,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            product_id: product.id,
            amount,
            invested_at: now,
            status: InvestmentStatus::Active,
            expected_return: Some(expected_return(
                amount,
                product.annual_yield,
                product.tenure_months,
            )?),
            maturity_date: Some(maturity_date(now, product.tenure_months)?),
        })
    }
}

/// Simple interest pro-rated over the tenure, rounded to cents.
/// Fails with a validation error when the result does not fit a money column.
pub fn expected_return(
    amount: Decimal,
    annual_yield: Decimal,
    tenure_months: i32,
) -> AppResult<Decimal> {
    amount
        .checked_mul(annual_yield)
        .and_then(|v| v.checked_mul(Decimal::from(tenure_months)))
        .and_then(|v| v.checked_div(Decimal::from(1200)))
        .map(|v| v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .filter(|v| v.abs() <= MAX_MONEY)
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new(
                "amount",
                "Expected return is out of range for this amount",
            )])
        })
}

/// Calendar-month add; days past the end of a shorter month clamp to its last day.
pub fn maturity_date(invested_at: DateTime<Utc>, tenure_months: i32) -> AppResult<NaiveDate> {
    let months = u32::try_from(tenure_months)
        .map_err(|_| anyhow::anyhow!("negative tenure: {}", tenure_months))?;
    invested_at
        .date_naive()
        .checked_add_months(Months::new(months))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("maturity date out of range")))
}

pub fn check_bounds(amount: Decimal, product: &InvestmentProduct) -> AppResult<()> {
    if amount < product.min_investment {
        return Err(AppError::BelowMinimum {
            minimum: product.min_investment,
        });
    }
    if let Some(maximum) = product.max_investment {
        if amount > maximum {
            return Err(AppError::AboveMaximum { maximum });
        }
    }
    Ok(())
}

#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentForm {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        let mut err = ValidationError::new("amount_positive");
        err.message = Some("Amount must be positive".into());
        return Err(err);
    }
    if *amount < Decimal::from(MIN_INVESTMENT_FLOOR) {
        let mut err = ValidationError::new("amount_floor");
        err.message = Some(format!("Amount must be at least {}", MIN_INVESTMENT_FLOOR).into());
        return Err(err);
    }
    if *amount > MAX_MONEY {
        let mut err = ValidationError::new("amount_ceiling");
        err.message = Some(format!("Amount must not exceed {}", MAX_MONEY).into());
        return Err(err);
    }
    if !has_money_scale(*amount) {
        let mut err = ValidationError::new("amount_scale");
        err.message = Some("Amount must have at most 2 decimal places".into());
        return Err(err);
    }
    Ok(())
}

/// An investment with the product fields it is shown with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentDetail {
    #[serde(flatten)]
    pub investment: Investment,
    pub product: ProductSummary,
}

/// Flat investment-product join row.
#[derive(sqlx::FromRow, Debug)]
pub struct InvestmentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub amount: Decimal,
    pub invested_at: DateTime<Utc>,
    pub status: InvestmentStatus,
    pub expected_return: Option<Decimal>,
    pub maturity_date: Option<NaiveDate>,
    pub product_name: String,
    pub investment_type: InvestmentType,
    pub annual_yield: Decimal,
    pub risk_level: RiskLevel,
    pub tenure_months: i32,
}

impl From<InvestmentRow> for InvestmentDetail {
    fn from(row: InvestmentRow) -> Self {
        Self {
            investment: Investment {
                id: row.id,
                user_id: row.user_id,
                product_id: row.product_id,
                amount: row.amount,
                invested_at: row.invested_at,
                status: row.status,
                expected_return: row.expected_return,
                maturity_date: row.maturity_date,
            },
            product: ProductSummary {
                id: row.product_id,
                name: row.product_name,
                investment_type: row.investment_type,
                annual_yield: row.annual_yield,
                risk_level: row.risk_level,
                tenure_months: row.tenure_months,
            },
        }
    }
}
