use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::constant::{DEFAULT_MIN_INVESTMENT, MAX_ANNUAL_YIELD, MAX_MONEY};
use crate::error::{AppError, AppResult, FieldError};
use crate::types::{InvestmentType, RiskLevel};
use crate::utils::has_money_scale;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentProduct {
    pub id: Uuid,
    pub name: String,
    pub investment_type: InvestmentType,
    pub tenure_months: i32,
    pub annual_yield: Decimal,
    pub risk_level: RiskLevel,
    pub min_investment: Decimal,
    pub max_investment: Option<Decimal>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvestmentProduct {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            investment_type: self.investment_type,
            annual_yield: self.annual_yield,
            risk_level: self.risk_level,
            tenure_months: self.tenure_months,
        }
    }
}

/// Product fields carried alongside an investment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub investment_type: InvestmentType,
    pub annual_yield: Decimal,
    pub risk_level: RiskLevel,
    pub tenure_months: i32,
}

#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,
    pub investment_type: InvestmentType,
    #[validate(range(min = 1, message = "Tenure must be at least one month"))]
    pub tenure_months: i32,
    pub annual_yield: Decimal,
    pub risk_level: RiskLevel,
    pub min_investment: Option<Decimal>,
    pub max_investment: Option<Decimal>,
    pub description: Option<String>,
}

impl ProductForm {
    /// Runs field rules plus the decimal bounds that `validator` cannot express.
    pub fn check(&self) -> AppResult<()> {
        let mut fields = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => match AppError::from(errors) {
                AppError::Validation(fields) => fields,
                other => return Err(other),
            },
        };
        if self.annual_yield.is_sign_negative() {
            fields.push(FieldError::new("annual_yield", "Annual yield cannot be negative"));
        } else if self.annual_yield > MAX_ANNUAL_YIELD || !has_money_scale(self.annual_yield) {
            fields.push(FieldError::new(
                "annual_yield",
                format!("Annual yield must be at most {} with 2 decimal places", MAX_ANNUAL_YIELD),
            ));
        }
        let min = self.min_investment();
        if min <= Decimal::ZERO {
            fields.push(FieldError::new("min_investment", "Minimum investment must be positive"));
        } else if let Some(message) = money_column_error(min) {
            fields.push(FieldError::new("min_investment", message));
        }
        if let Some(max) = self.max_investment {
            if max < min {
                fields.push(FieldError::new(
                    "max_investment",
                    "Maximum investment must not be below the minimum",
                ));
            } else if let Some(message) = money_column_error(max) {
                fields.push(FieldError::new("max_investment", message));
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(fields))
        }
    }

    pub fn min_investment(&self) -> Decimal {
        self.min_investment
            .unwrap_or_else(|| Decimal::from(DEFAULT_MIN_INVESTMENT))
    }

    pub fn into_product(self, now: DateTime<Utc>) -> InvestmentProduct {
        let min_investment = self.min_investment();
        let description = match self.description {
            Some(d) if !d.trim().is_empty() => d,
            _ => describe(
                &self.name,
                self.investment_type,
                self.annual_yield,
                self.tenure_months,
                self.risk_level,
            ),
        };
        InvestmentProduct {
            id: Uuid::new_v4(),
            name: self.name,
            investment_type: self.investment_type,
            tenure_months: self.tenure_months,
            annual_yield: self.annual_yield,
            risk_level: self.risk_level,
            min_investment,
            max_investment: self.max_investment,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

fn money_column_error(value: Decimal) -> Option<String> {
    if value > MAX_MONEY {
        Some(format!("Must not exceed {}", MAX_MONEY))
    } else if !has_money_scale(value) {
        Some("Must have at most 2 decimal places".to_string())
    } else {
        None
    }
}

pub fn describe(
    name: &str,
    investment_type: InvestmentType,
    annual_yield: Decimal,
    tenure_months: i32,
    risk_level: RiskLevel,
) -> String {
    format!(
        "{}: {} with {}% annual yield over {} months ({} risk)",
        name,
        investment_type.label(),
        annual_yield.normalize(),
        tenure_months,
        risk_level.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn form() -> ProductForm {
        ProductForm {
            name: "Gov Bond 2030".to_string(),
            investment_type: InvestmentType::Bond,
            tenure_months: 24,
            annual_yield: dec!(8.50),
            risk_level: RiskLevel::Low,
            min_investment: None,
            max_investment: None,
            description: None,
        }
    }

    #[test]
    fn missing_description_is_generated() {
        let product = form().into_product(Utc::now());
        assert_eq!(
            product.description,
            "Gov Bond 2030: Bond with 8.5% annual yield over 24 months (low risk)"
        );
        assert_eq!(product.min_investment, dec!(1000));
    }

    #[test]
    fn blank_description_is_generated_too() {
        let mut f = form();
        f.description = Some("   ".to_string());
        assert!(f.into_product(Utc::now()).description.starts_with("Gov Bond 2030: Bond"));
    }

    #[test]
    fn max_below_min_is_rejected() {
        let mut f = form();
        f.min_investment = Some(dec!(5000));
        f.max_investment = Some(dec!(4999.99));
        match f.check() {
            Err(AppError::Validation(fields)) => {
                assert!(fields.iter().any(|e| e.field == "max_investment"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn zero_tenure_and_negative_yield_are_rejected() {
        let mut f = form();
        f.tenure_months = 0;
        f.annual_yield = dec!(-1);
        match f.check() {
            Err(AppError::Validation(fields)) => {
                assert!(fields.iter().any(|e| e.field == "tenure_months"));
                assert!(fields.iter().any(|e| e.field == "annual_yield"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    fn rejected_fields(f: ProductForm) -> Vec<String> {
        match f.check() {
            Err(AppError::Validation(fields)) => fields.into_iter().map(|e| e.field).collect(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn yield_must_fit_its_column() {
        let mut f = form();
        f.annual_yield = dec!(1000);
        assert_eq!(rejected_fields(f), vec!["annual_yield"]);

        let mut f = form();
        f.annual_yield = dec!(8.555);
        assert_eq!(rejected_fields(f), vec!["annual_yield"]);

        let mut f = form();
        f.annual_yield = dec!(999.99);
        assert!(f.check().is_ok());
    }

    #[test]
    fn investment_bounds_must_fit_money_column() {
        let mut f = form();
        f.min_investment = Some(dec!(1000.005));
        assert_eq!(rejected_fields(f), vec!["min_investment"]);

        let mut f = form();
        f.max_investment = Some(dec!(10000000000000));
        assert_eq!(rejected_fields(f), vec!["max_investment"]);

        let mut f = form();
        f.min_investment = Some(dec!(2500.50));
        f.max_investment = Some(dec!(9999999999999.99));
        assert!(f.check().is_ok());
    }

    #[test]
    fn valid_form_passes() {
        assert!(form().check().is_ok());
    }
}
