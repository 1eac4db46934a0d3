use crate::config::{Environment, RedisConfig};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use fred::{
    clients::RedisPool,
    interfaces::{ClientLike, KeysInterface, ServerInterface},
    types::{Builder, Expiration, InfoKind, RedisConfig as FredRedisConfig, Scanner},
};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// SCAN page size for pattern listings
const SCAN_PAGE_SIZE: u32 = 100;

/// Timeout applied to connectivity probes
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort backend introspection
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Number of keys currently stored
    pub key_count: u64,
    /// Human-readable memory figure when the backend exposes one
    pub memory_usage_human: Option<String>,
}

/// Key-value backend behind the cache service.
///
/// Every method is fail-open: connectivity and runtime errors are swallowed
/// inside the implementation and reported as a sentinel (None, false, 0 or an
/// empty list), so callers can always fall back to the store. The single
/// exception is `flush_all`, whose production guard is a programmer/operator
/// error and therefore surfaces as `ServiceError::OperationForbidden`.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Establish a connection; idempotent. Returns true when usable.
    async fn connect(&self) -> bool;

    /// Fetch a raw value. None on miss or on any backend error.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a raw value with a TTL. False when the write did not happen.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool;

    /// Delete one or more keys. Returns the number of keys removed.
    async fn delete(&self, keys: &[String]) -> u64;

    /// List keys matching a glob pattern. Empty on error.
    async fn keys_by_pattern(&self, pattern: &str) -> Vec<String>;

    /// Remove every key. Refused outside non-production environments.
    async fn flush_all(&self) -> ServiceResult<()>;

    /// Key count and memory usage. None when the backend cannot be queried.
    async fn info(&self) -> Option<BackendInfo>;

    /// Connectivity probe. Round-trip latency in milliseconds when reachable.
    async fn ping(&self) -> Option<f64>;

    /// Close the connection for shutdown. Best-effort.
    async fn disconnect(&self);
}

/// Redis adapter with lazy connection and pooling.
///
/// The pool is created on first use; the initial connection attempt is raced
/// against the configured timeout so a slow backend cannot stall startup. A
/// pool whose link dropped is reported as unavailable on the hot path and
/// replaced on the next explicit `connect` call (the monitoring loop issues
/// one on every tick).
pub struct RedisBackend {
    pool: RwLock<Option<RedisPool>>,
    config: RedisConfig,
    environment: Environment,
}

impl RedisBackend {
    /// Create a backend without connecting
    pub fn new(config: RedisConfig, environment: Environment) -> Self {
        RedisBackend {
            pool: RwLock::new(None),
            config,
            environment,
        }
    }

    fn build_pool(config: &RedisConfig) -> ServiceResult<RedisPool> {
        let redis_config = FredRedisConfig::from_url(&config.url)
            .map_err(|e| ServiceError::RedisError(format!("Invalid Redis URL: {}", e)))?;

        let timeout_secs = config.connection_timeout_secs;
        Builder::from_config(redis_config)
            .with_connection_config(|conn_config| {
                conn_config.connection_timeout = Duration::from_secs(timeout_secs);
            })
            .with_performance_config(|perf_config| {
                perf_config.auto_pipeline = true;
                perf_config.default_command_timeout = Duration::from_secs(timeout_secs);
            })
            .build_pool(config.max_connections as usize)
            .map_err(|e| ServiceError::RedisError(format!("Failed to create Redis pool: {}", e)))
    }

    /// Resolve a usable pool handle, connecting lazily on first use.
    ///
    /// A pool that exists but lost its link returns None immediately rather
    /// than re-running the connection race on every cache operation.
    async fn handle(&self) -> Option<RedisPool> {
        {
            let guard = self.pool.read().await;
            if let Some(pool) = guard.as_ref() {
                if pool.is_connected() {
                    return Some(pool.clone());
                }
                return None;
            }
        }

        if self.connect().await {
            self.pool.read().await.clone()
        } else {
            None
        }
    }

    fn log_backend_error(&self, operation: &str, error: &fred::error::RedisError) {
        warn!("Redis {} failed, treating as cache miss: {}", operation, error);
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn connect(&self) -> bool {
        let mut guard = self.pool.write().await;

        if let Some(pool) = guard.as_ref() {
            if pool.is_connected() {
                return true;
            }
            // Stale pool from an earlier attempt; replace it
            if let Some(old) = guard.take() {
                let _ = old.quit().await;
            }
        }

        let pool = match Self::build_pool(&self.config) {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Could not create Redis pool, caching disabled: {}", e);
                return false;
            }
        };

        // The connect task keeps running in the background; the race only
        // bounds how long startup and lazy first use will wait for it.
        let _ = pool.connect();
        let wait = Duration::from_secs(self.config.connection_timeout_secs);
        match timeout(wait, pool.wait_for_connect()).await {
            Ok(Ok(())) => {
                info!("Redis cache connected");
                *guard = Some(pool);
                true
            }
            Ok(Err(e)) => {
                warn!("Redis cache unavailable, falling back to the store: {}", e);
                *guard = Some(pool);
                false
            }
            Err(_) => {
                warn!(
                    "Redis connection attempt exceeded {}s, falling back to the store",
                    self.config.connection_timeout_secs
                );
                *guard = Some(pool);
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        let pool = self.handle().await?;

        match pool.get::<Option<String>, _>(key).await {
            Ok(value) => value,
            Err(e) => {
                self.log_backend_error("GET", &e);
                None
            }
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(pool) = self.handle().await else {
            return false;
        };

        let result: Result<(), _> = pool
            .set(key, value, Some(Expiration::EX(ttl_secs as i64)), None, false)
            .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                self.log_backend_error("SETEX", &e);
                false
            }
        }
    }

    async fn delete(&self, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        let Some(pool) = self.handle().await else {
            return 0;
        };

        // UNLINK reclaims memory off the main thread
        match pool.unlink::<i64, _>(keys.to_vec()).await {
            Ok(count) => count.max(0) as u64,
            Err(e) => {
                self.log_backend_error("UNLINK", &e);
                0
            }
        }
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Vec<String> {
        let Some(pool) = self.handle().await else {
            return Vec::new();
        };

        let client = pool.next().clone();
        let mut stream = client.scan(pattern, Some(SCAN_PAGE_SIZE), None);
        let mut keys = Vec::new();

        while let Some(page) = stream.next().await {
            match page {
                Ok(mut page) => {
                    if let Some(page_keys) = page.take_results() {
                        keys.extend(page_keys.into_iter().filter_map(|k| k.into_string()));
                    }
                    if let Err(e) = page.next() {
                        self.log_backend_error("SCAN", &e);
                        break;
                    }
                }
                Err(e) => {
                    self.log_backend_error("SCAN", &e);
                    break;
                }
            }
        }

        debug!("SCAN {} matched {} keys", pattern, keys.len());
        keys
    }

    async fn flush_all(&self) -> ServiceResult<()> {
        // Guard check happens before any I/O
        if self.environment.is_production() {
            return Err(ServiceError::OperationForbidden(
                "FLUSHALL is not permitted in production".to_string(),
            ));
        }

        let Some(pool) = self.handle().await else {
            warn!("FLUSHALL skipped, Redis is unavailable");
            return Ok(());
        };

        match pool.flushall::<()>(false).await {
            Ok(()) => {
                info!("Redis cache flushed");
                Ok(())
            }
            Err(e) => {
                self.log_backend_error("FLUSHALL", &e);
                Ok(())
            }
        }
    }

    async fn info(&self) -> Option<BackendInfo> {
        let pool = self.handle().await?;

        let key_count = match pool.dbsize::<i64>().await {
            Ok(count) => count.max(0) as u64,
            Err(e) => {
                self.log_backend_error("DBSIZE", &e);
                return None;
            }
        };

        // The memory figure is optional; INFO may be restricted on managed
        // deployments
        let memory_usage_human = match pool.info::<String>(Some(InfoKind::Memory)).await {
            Ok(info) => info.lines().find_map(|line| {
                line.strip_prefix("used_memory_human:")
                    .map(|v| v.trim().to_string())
            }),
            Err(e) => {
                self.log_backend_error("INFO", &e);
                None
            }
        };

        Some(BackendInfo {
            key_count,
            memory_usage_human,
        })
    }

    async fn ping(&self) -> Option<f64> {
        if !self.connect().await {
            return None;
        }

        let pool = self.pool.read().await.clone()?;
        let start = Instant::now();

        match timeout(PING_TIMEOUT, pool.ping::<String>()).await {
            Ok(Ok(_)) => {
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                debug!("Redis ping completed in {:.2}ms", latency_ms);
                Some(latency_ms)
            }
            Ok(Err(e)) => {
                self.log_backend_error("PING", &e);
                None
            }
            Err(_) => {
                warn!("Redis ping timed out");
                None
            }
        }
    }

    async fn disconnect(&self) {
        let mut guard = self.pool.write().await;
        if let Some(pool) = guard.take() {
            if let Err(e) = pool.quit().await {
                warn!("Error while closing Redis connection: {}", e);
            } else {
                info!("Redis connection closed");
            }
        }
    }
}
