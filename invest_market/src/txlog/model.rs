use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub error_code: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Count {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInsights {
    pub total: usize,
    pub errors: usize,
    pub error_rate: Decimal,
    pub by_code: Vec<Count>,
    pub by_path: Vec<Count>,
    pub top_failing_path: Option<String>,
}

/// Error pattern summary over a window of records.
pub fn analyze(records: &[TransactionRecord]) -> ErrorInsights {
    let failed: Vec<&TransactionRecord> = records.iter().filter(|r| r.is_error()).collect();
    let by_code = tally(failed.iter().map(|r| {
        r.error_code
            .clone()
            .unwrap_or_else(|| format!("HTTP_{}", r.status))
    }));
    let by_path = tally(failed.iter().map(|r| format!("{} {}", r.method, r.path)));

    let error_rate = if records.is_empty() {
        Decimal::ZERO
    } else {
        (Decimal::from(failed.len() * 100) / Decimal::from(records.len()))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    ErrorInsights {
        total: records.len(),
        errors: failed.len(),
        error_rate,
        top_failing_path: by_path.first().map(|c| c.key.clone()),
        by_code,
        by_path,
    }
}

/// Counts descending; ties keep first-seen order.
fn tally(keys: impl Iterator<Item = String>) -> Vec<Count> {
    let mut counts: Vec<Count> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|c| c.key == key) {
            Some(c) => c.count += 1,
            None => counts.push(Count { key, count: 1 }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}
