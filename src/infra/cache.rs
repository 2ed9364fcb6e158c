use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::warn;

#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    /// Best-effort read; connection or decode failures count as a miss.
    pub async fn get_string(&self, key: &str) -> Option<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await.ok()?;
        conn.get::<_, Option<String>>(key).await.ok().flatten()
    }

    pub async fn set_string_ex(&self, key: &str, value: String, ttl_seconds: u64) {
        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                if let Err(err) = conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await {
                    warn!(error = ?err, key, "failed to write cache entry");
                }
            }
            Err(err) => warn!(error = ?err, "failed to connect to cache"),
        }
    }

    /// Reads an integer counter, treating a missing key as zero.
    pub async fn get_counter(&self, key: &str) -> Option<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await.ok()?;
        conn.get::<_, Option<i64>>(key)
            .await
            .ok()
            .map(|value| value.unwrap_or(0))
    }

    pub async fn incr_counter(&self, key: &str) {
        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                if let Err(err) = conn.incr::<_, _, i64>(key, 1).await {
                    warn!(error = ?err, key, "failed to bump cache counter");
                }
            }
            Err(err) => warn!(error = ?err, "failed to connect to cache"),
        }
    }
}
