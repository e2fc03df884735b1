use rust_decimal::{Decimal, RoundingStrategy};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::investment::model::InvestmentDetail;
use crate::types::InvestmentStatus;

/// Amount per category, kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution(Vec<(String, Decimal)>);

impl Distribution {
    pub fn add(&mut self, key: &str, amount: Decimal) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, total)) => *total += amount,
            None => self.0.push((key.to_string(), amount)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.0.iter().map(|(_, v)| *v).sum()
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_invested: Decimal,
    pub total_expected_return: Decimal,
    pub active_investments: usize,
    pub average_yield: Decimal,
    pub risk_distribution: Distribution,
    pub type_distribution: Distribution,
}

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub investments: Vec<InvestmentDetail>,
    pub portfolio: PortfolioSummary,
}

/// Derives portfolio statistics from a user's investments.
///
/// Totals and distributions cover every status; the expected return only
/// counts active investments. Average yield is rounded to two places.
pub fn summarize(investments: &[InvestmentDetail]) -> PortfolioSummary {
    let mut summary = PortfolioSummary::default();
    let mut yield_sum = Decimal::ZERO;

    for detail in investments {
        let amount = detail.investment.amount;
        summary.total_invested += amount;
        yield_sum += detail.product.annual_yield;

        if detail.investment.status == InvestmentStatus::Active {
            summary.active_investments += 1;
            summary.total_expected_return += detail.investment.expected_return.unwrap_or_default();
        }

        summary
            .risk_distribution
            .add(detail.product.risk_level.as_str(), amount);
        summary
            .type_distribution
            .add(detail.product.investment_type.as_str(), amount);
    }

    if !investments.is_empty() {
        summary.average_yield = (yield_sum / Decimal::from(investments.len()))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    }
    summary
}
