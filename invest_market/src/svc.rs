use std::sync::Arc;

use auth_validate::jwt::{Claims, Role};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::auth::model::{ForgotPasswordForm, LoginForm, ResetPasswordForm, SignupForm};
use crate::auth::svc::{AuthService, AuthSettings};
use crate::clock::Clock;
use crate::constant::INSIGHTS_WINDOW;
use crate::error::{AppError, AppResult};
use crate::investment::model::InvestmentForm;
use crate::investment::svc::InvestmentService;
use crate::mdw::{Middleware, require_role};
use crate::notify::Notifier;
use crate::product::model::ProductForm;
use crate::product::svc::CatalogService;
use crate::redis::RedisCache;
use crate::req::Request;
use crate::store::Stores;
use crate::txlog::model::{TransactionRecord, analyze};
use crate::txlog::repo::TxLogStore;
use crate::user::model::ProfileForm;
use crate::utils::{des_from_str, ser_to_value};

pub type Reply = AppResult<(u16, Value)>;

#[derive(Clone)]
pub struct Service {
    auth: AuthService,
    catalog: CatalogService,
    investments: InvestmentService,
    txlog: Arc<dyn TxLogStore>,
    clock: Arc<dyn Clock>,
}

impl Service {
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
        cache: Option<RedisCache>,
    ) -> Self {
        Self {
            auth: AuthService::new(
                stores.users,
                stores.reset_tokens,
                notifier,
                clock.clone(),
                settings,
            ),
            catalog: CatalogService::new(stores.products, cache, clock.clone()),
            investments: InvestmentService::new(stores.investments, clock.clone()),
            txlog: stores.txlog,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn authenticate(&self, request: &Request) -> AppResult<Claims> {
        Middleware::authenticate(request, self.auth.keys(), self.clock.now())
    }

    pub async fn signup(&self, request: &Request) -> Reply {
        let form: SignupForm = des_from_str(request.body_str())?;
        let res = self.auth.signup(form).await?;
        Ok((201, ser_to_value(&res)?))
    }

    pub async fn login(&self, request: &Request) -> Reply {
        let form: LoginForm = des_from_str(request.body_str())?;
        let res = self.auth.login(form).await?;
        Ok((200, ser_to_value(&res)?))
    }

    pub async fn me(&self, claims: &Claims) -> Reply {
        let user = self.auth.current_user(claims).await?;
        Ok((200, json!({ "user": user })))
    }

    pub async fn update_profile(&self, request: &Request, claims: &Claims) -> Reply {
        let form: ProfileForm = des_from_str(request.body_str())?;
        let user = self.auth.update_profile(claims, form).await?;
        Ok((200, json!({ "user": user })))
    }

    pub async fn forgot_password(&self, request: &Request) -> Reply {
        let form: ForgotPasswordForm = des_from_str(request.body_str())?;
        Ok((200, self.auth.forgot_password(form).await?))
    }

    pub async fn reset_password(&self, request: &Request) -> Reply {
        let form: ResetPasswordForm = des_from_str(request.body_str())?;
        Ok((200, self.auth.reset_password(form).await?))
    }

    pub async fn list_products(&self) -> Reply {
        let products = self.catalog.list().await?;
        Ok((200, json!({ "products": products })))
    }

    pub async fn get_product(&self, id: &str) -> Reply {
        let id = Uuid::parse_str(id).map_err(|_| AppError::ProductNotFound)?;
        let product = self.catalog.get(id).await?;
        Ok((200, json!({ "product": product })))
    }

    pub async fn create_product(&self, request: &Request, claims: &Claims) -> Reply {
        require_role(claims, Role::Admin)?;
        let form: ProductForm = des_from_str(request.body_str())?;
        let product = self.catalog.create(claims, form).await?;
        Ok((201, json!({ "product": product })))
    }

    pub async fn delete_product(&self, claims: &Claims, id: &str) -> Reply {
        require_role(claims, Role::Admin)?;
        let id = Uuid::parse_str(id).map_err(|_| AppError::ProductNotFound)?;
        self.catalog.delete(claims, id).await?;
        Ok((200, json!({ "message": "Product deleted" })))
    }

    pub async fn get_investments(&self, claims: &Claims) -> Reply {
        let user_id = Middleware::user_id(claims)?;
        let portfolio = self.investments.portfolio(user_id).await?;
        Ok((200, ser_to_value(&portfolio)?))
    }

    pub async fn create_investment(&self, request: &Request, claims: &Claims) -> Reply {
        let user_id = Middleware::user_id(claims)?;
        let form: InvestmentForm = des_from_str(request.body_str())?;
        let investment = self.investments.create(user_id, form).await?;
        Ok((201, json!({ "investment": investment })))
    }

    pub async fn get_investment(&self, claims: &Claims, id: &str) -> Reply {
        let user_id = Middleware::user_id(claims)?;
        let id = Uuid::parse_str(id).map_err(|_| AppError::InvestmentNotFound)?;
        let investment = self.investments.get(user_id, id).await?;
        Ok((200, json!({ "investment": investment })))
    }

    pub async fn error_insights(&self, claims: &Claims) -> Reply {
        require_role(claims, Role::Admin)?;
        let records = self.txlog.recent(INSIGHTS_WINDOW).await?;
        Ok((200, json!({ "insights": analyze(&records) })))
    }

    /// Write failures are logged and dropped.
    pub async fn record(&self, record: TransactionRecord) {
        if let Err(e) = self.txlog.insert(&record).await {
            warn!(path = %record.path, "transaction log write failed: {:?}", e);
        }
    }
}
