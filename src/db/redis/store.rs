use redis::AsyncCommands;
use redis::Client;

use crate::db::store::{PersistentStore, StoreKey};
use crate::error::AppResult;

/// Stored sessions expire after 30 days without a write
pub const SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Creates a Redis client for session snapshots
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed [`PersistentStore`]
///
/// Writes complete before `set_raw` returns, so a failed checkpoint reaches
/// the caller as an error.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl PersistentStore for RedisStore {
    async fn get_raw(&self, key: &StoreKey) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &StoreKey, value: String) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.to_string(), value, SESSION_TTL_SECS).await?;
        tracing::debug!(key = %key, "Session snapshot written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// Run with `cargo test -- --ignored` against the Redis at REDIS_URL

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{load, save};
    use crate::error::AppError;
    use crate::models::Location;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[tokio::test]
    async fn test_failed_write_reaches_caller() {
        // Nothing listens on port 1
        let store = RedisStore::new(create_redis_client("redis://127.0.0.1:1").unwrap());

        let key = StoreKey::Location("unreachable".to_string());
        let location = Location::new("Oslo", 59.9139, 10.7522).unwrap();
        let result = save(&store, &key, &location).await;

        assert!(matches!(result, Err(AppError::Store(_))), "got: {:?}", result);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_missing_snapshot() {
        let store = RedisStore::new(create_redis_client(&redis_url()).unwrap());

        let key = StoreKey::Location("nonexistent_session_12345".to_string());
        let loaded: Option<Location> = load(&store, &key).await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_write_visible_immediately() {
        let client = create_redis_client(&redis_url()).unwrap();
        let store = RedisStore::new(client.clone());

        let key = StoreKey::Location("test_write_session".to_string());
        let location = Location::new("Oslo", 59.9139, 10.7522).unwrap();
        save(&store, &key, &location).await.unwrap();

        let loaded: Option<Location> = load(&store, &key).await.unwrap();
        assert_eq!(loaded, Some(location));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let ttl: i64 = conn.ttl(key.to_string()).await.unwrap();
        assert!(ttl > 0 && ttl as u64 <= SESSION_TTL_SECS);
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
