use async_trait::async_trait;
use tracing::{debug, info};

use busline_core::{KvStore, StoreError, Versioned};

// Each entry is a hash: `v` holds the version, `d` the JSON document.
const PUT_SCRIPT: &str = r#"
    local v = redis.call("HINCRBY", KEYS[1], "v", 1)
    redis.call("HSET", KEYS[1], "d", ARGV[1])
    return v
"#;

// ARGV[1] is the expected version, empty when the key must be absent.
const CAS_SCRIPT: &str = r#"
    local current = redis.call("HGET", KEYS[1], "v")
    if ARGV[1] == "" then
        if current then
            return 0
        end
    elseif (not current) or current ~= ARGV[1] then
        return 0
    end
    redis.call("HINCRBY", KEYS[1], "v", 1)
    redis.call("HSET", KEYS[1], "d", ARGV[2])
    return 1
"#;

#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
}

impl RedisStore {
    pub async fn new(connection_string: &str, prefix: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_string).map_err(backend)?;
        // Fail at startup rather than on the first booking.
        let mut conn = client.get_multiplexed_async_connection().await.map_err(backend)?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await.map_err(backend)?;
        info!("Connected to Redis store");
        Ok(Self {
            client,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(backend)?;
        let (version, value): (Option<u64>, Option<String>) = redis::cmd("HMGET")
            .arg(self.key(key))
            .arg("v")
            .arg("d")
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        Ok(match (version, value) {
            (Some(version), Some(value)) => Some(Versioned { version, value }),
            _ => None,
        })
    }

    async fn put(&self, key: &str, value: String) -> Result<u64, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(backend)?;
        let version: u64 = redis::Script::new(PUT_SCRIPT)
            .key(self.key(key))
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(version)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
    ) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(backend)?;
        let expected_arg = expected.map(|v| v.to_string()).unwrap_or_default();
        let swapped: i64 = redis::Script::new(CAS_SCRIPT)
            .key(self.key(key))
            .arg(expected_arg)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        if swapped == 0 {
            debug!("CAS rejected for {} (expected {:?})", key, expected);
        }
        Ok(swapped == 1)
    }
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}
