use std::sync::Arc;

use auth_validate::jwt::{Claims, Role};
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{InvestmentProduct, ProductForm};
use super::repo::ProductStore;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::mdw::require_role;
use crate::redis::{RedisCache, product_key};

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    cache: Option<RedisCache>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        cache: Option<RedisCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            products,
            cache,
            clock,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<InvestmentProduct>> {
        self.products.list().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<InvestmentProduct> {
        let key = product_key(&id);
        if let Some(cache) = &self.cache {
            match cache.get_cached::<InvestmentProduct>(&key).await {
                Ok(Some(product)) => return Ok(product),
                Ok(None) => {}
                Err(e) => warn!(product_id = %id, "product cache read failed: {}", e),
            }
        }

        let product = self
            .products
            .find_by_id(id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_cache(&key, &product).await {
                warn!(product_id = %id, "product cache write failed: {}", e);
            }
        }
        Ok(product)
    }

    pub async fn create(&self, claims: &Claims, form: ProductForm) -> AppResult<InvestmentProduct> {
        require_role(claims, Role::Admin)?;
        form.check()?;
        let product = form.into_product(self.clock.now());
        self.products.insert(&product).await?;
        info!(product_id = %product.id, admin = %claims.sub, "product created");
        Ok(product)
    }

    pub async fn delete(&self, claims: &Claims, id: Uuid) -> AppResult<()> {
        require_role(claims, Role::Admin)?;
        if !self.products.delete(id).await? {
            return Err(AppError::ProductNotFound);
        }
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate(&product_key(&id)).await {
                warn!(product_id = %id, "product cache invalidation failed: {}", e);
            }
        }
        info!(product_id = %id, admin = %claims.sub, "product deleted");
        Ok(())
    }
}
