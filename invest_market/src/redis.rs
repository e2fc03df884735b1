use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisCache {
    pub async fn new(url: &str, ttl_secs: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl_secs })
    }

    /// Entries that no longer deserialize are treated as misses.
    pub async fn get_cached<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, redis::RedisError> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        match data {
            Some(json) => Ok(serde_json::from_str(&json).ok()),
            None => Ok(None),
        }
    }

    pub async fn set_cache<T: Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), redis::RedisError> {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, "skip caching unserializable value: {}", e);
                return Ok(());
            }
        };
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, json, self.ttl_secs).await?;
        Ok(())
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

pub fn product_key(id: &uuid::Uuid) -> String {
    format!("product:{}", id)
}
