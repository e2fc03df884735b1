use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "risk_level", rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "investment_type", rename_all = "lowercase")]
pub enum InvestmentType {
    Bond,
    Fd,
    Mf,
    Etf,
    Other,
}

impl InvestmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentType::Bond => "bond",
            InvestmentType::Fd => "fd",
            InvestmentType::Mf => "mf",
            InvestmentType::Etf => "etf",
            InvestmentType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InvestmentType::Bond => "Bond",
            InvestmentType::Fd => "Fixed Deposit",
            InvestmentType::Mf => "Mutual Fund",
            InvestmentType::Etf => "ETF",
            InvestmentType::Other => "Investment",
        }
    }
}

/// Only `Active` is ever written; the other states exist in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "investment_status", rename_all = "lowercase")]
pub enum InvestmentStatus {
    #[default]
    Active,
    Matured,
    Cancelled,
}
