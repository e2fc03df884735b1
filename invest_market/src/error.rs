use std::{error::Error, fmt::Debug};

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};

use crate::auth::password::PasswordStrength;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Product is referenced by existing investments")]
    ProductInUse,

    #[error("Investment not found")]
    InvestmentNotFound,

    #[error("Password does not meet requirements")]
    WeakPassword(PasswordStrength),

    #[error("Invalid or expired reset code")]
    InvalidOrExpiredCode,

    #[error("Minimum investment amount is {minimum}")]
    BelowMinimum { minimum: Decimal },

    #[error("Maximum investment amount is {maximum}")]
    AboveMaximum { maximum: Decimal },

    #[error("Failed to send notification")]
    NotificationFailed(String),

    #[error("Route not found")]
    NotFound,

    #[error("Request too large")]
    PayloadTooLarge,

    #[error("Query error")]
    Database(#[from] sqlx::Error),

    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        if let Some(source) = self.source() {
            write!(f, " (Caused by: {})", source)?;
        }
        if let AppError::NotificationFailed(reason) = self {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter()
                    .map(|e| FieldError {
                        field: field.clone(),
                        message: e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string()),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
        AppError::Validation(fields)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(vec![FieldError::new("body", err.to_string())])
    }
}

impl AppError {
    pub fn status(&self) -> u16 {
        match self {
            AppError::Validation(_)
            | AppError::WeakPassword(_)
            | AppError::BelowMinimum { .. }
            | AppError::AboveMaximum { .. } => 400,
            AppError::Unauthenticated
            | AppError::InvalidCredentials
            | AppError::InvalidOrExpiredCode => 401,
            AppError::Forbidden => 403,
            AppError::UserNotFound
            | AppError::ProductNotFound
            | AppError::InvestmentNotFound
            | AppError::NotFound => 404,
            AppError::DuplicateEmail | AppError::ProductInUse => 409,
            AppError::PayloadTooLarge => 413,
            AppError::NotificationFailed(_)
            | AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::ProductNotFound => "PRODUCT_NOT_FOUND",
            AppError::ProductInUse => "PRODUCT_IN_USE",
            AppError::InvestmentNotFound => "INVESTMENT_NOT_FOUND",
            AppError::WeakPassword(_) => "WEAK_PASSWORD",
            AppError::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            AppError::BelowMinimum { .. } => "BELOW_MINIMUM",
            AppError::AboveMaximum { .. } => "ABOVE_MAXIMUM",
            AppError::NotificationFailed(_) => "NOTIFICATION_FAILED",
            AppError::NotFound => "NOT_FOUND",
            AppError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing body. Store and cache failures render a generic message.
    pub fn body(&self) -> Value {
        let message = match self {
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let mut body = json!({
            "status": "error",
            "code": self.code(),
            "message": message,
        });
        let details = match self {
            AppError::Validation(fields) => Some(json!(fields)),
            AppError::WeakPassword(strength) => Some(json!({
                "score": strength.score,
                "feedback": strength.feedback,
            })),
            _ => None,
        };
        if let Some(details) = details {
            body["details"] = details;
        }
        body
    }
}

pub type AppResult<T> = Result<T, AppError>;
