pub mod memory;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::investment::repo::{InvestmentRepo, InvestmentStore};
use crate::product::repo::{ProductRepository, ProductStore};
use crate::reset::repo::{ResetTokenRepo, ResetTokenStore};
use crate::txlog::repo::{TxLogRepo, TxLogStore};
use crate::user::repo::{UserRepo, UserStore};

/// Handles to every table the service touches.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub reset_tokens: Arc<dyn ResetTokenStore>,
    pub products: Arc<dyn ProductStore>,
    pub investments: Arc<dyn InvestmentStore>,
    pub txlog: Arc<dyn TxLogStore>,
}

impl Stores {
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(UserRepo::new(pool.clone())),
            reset_tokens: Arc::new(ResetTokenRepo::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
            investments: Arc::new(InvestmentRepo::new(pool.clone())),
            txlog: Arc::new(TxLogRepo::new(pool)),
        }
    }

    pub fn memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            reset_tokens: store.clone(),
            products: store.clone(),
            investments: store.clone(),
            txlog: store,
        }
    }
}
