use std::collections::HashMap;
use std::sync::Arc;

use auth_validate::jwt::JwtKeys;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::auth::svc::AuthSettings;
use crate::clock::FixedClock;
use crate::notify::RecordingNotifier;
use crate::product::model::InvestmentProduct;
use crate::product::repo::ProductStore;
use crate::req::{Method, Request};
use crate::store::Stores;
use crate::store::memory::MemoryStore;
use crate::svc::Service;
use crate::types::{InvestmentType, RiskLevel};

pub const ADMIN_EMAIL: &str = "admin@invest.io";
pub const STRONG: &str = "Tr1cky&Horse";

pub struct Harness {
    pub svc: Service,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<FixedClock>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap()));
    let svc = Service::new(
        Stores::memory(store.clone()),
        notifier.clone(),
        clock.clone(),
        AuthSettings {
            keys: JwtKeys::from_secret(b"harness"),
            session_ttl: Duration::days(7),
            reset_ttl: Duration::minutes(15),
            hasher: PasswordHasher::new(1024, 1).unwrap(),
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        None,
    );
    Harness {
        svc,
        store,
        notifier,
        clock,
    }
}

pub fn request(method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Request {
    let mut headers = HashMap::new();
    if let Some(token) = token {
        headers.insert("authorization".to_string(), format!("Bearer {}", token));
    }
    Request {
        method,
        path: path.to_string(),
        params: None,
        headers,
        body: body.map(|b| b.to_string()),
    }
}

pub fn product(
    annual_yield: Decimal,
    tenure_months: i32,
    risk_level: RiskLevel,
    investment_type: InvestmentType,
    min_investment: Decimal,
    max_investment: Option<Decimal>,
) -> InvestmentProduct {
    let now = Utc::now();
    InvestmentProduct {
        id: Uuid::new_v4(),
        name: format!("{} {}m", investment_type.label(), tenure_months),
        investment_type,
        tenure_months,
        annual_yield,
        risk_level,
        min_investment,
        max_investment,
        description: String::new(),
        created_at: now,
        updated_at: now,
    }
}

pub async fn seed(store: &MemoryStore, product: &InvestmentProduct) {
    ProductStore::insert(store, product).await.unwrap();
}
