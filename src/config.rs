use crate::error::{ServiceError, ServiceResult};
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment, gates destructive cache operations
    pub environment: Environment,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Per-entity cache TTLs
    pub ttl: CacheTtlConfig,
    /// Cache health monitoring configuration
    pub monitor: MonitorConfig,
    /// Search indexing configuration
    pub indexing: IndexingConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// Parse from the ENVIRONMENT variable value
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
    /// Maximum Redis connections in the pool
    pub max_connections: u32,
    /// Connection attempt timeout in seconds
    pub connection_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection URL
    pub url: String,
    /// Maximum database connections in the pool
    pub max_connections: u32,
    /// Statement timeout in milliseconds
    pub statement_timeout_ms: u64,
}

/// Per-entity cache TTLs in seconds
///
/// Search results are cheaper to recompute and go stale with every corpus
/// change, so their TTL must not exceed the transcript/metadata TTLs.
#[derive(Debug, Clone)]
pub struct CacheTtlConfig {
    /// TTL for cached transcripts
    pub transcript_secs: u64,
    /// TTL for cached video metadata
    pub video_metadata_secs: u64,
    /// TTL for cached search results
    pub search_results_secs: u64,
}

/// Cache health monitoring configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Whether the monitoring loop starts at boot
    pub enabled: bool,
    /// Interval between health checks in seconds
    pub interval_secs: u64,
    /// Minimum acceptable hit rate in percent
    pub min_hit_rate: f64,
    /// Maximum acceptable average latency in milliseconds
    pub max_latency_ms: f64,
    /// Maximum acceptable error rate in percent
    pub max_error_rate: f64,
    /// Key count above which a cleanup recommendation is emitted
    pub key_count_warning: u64,
}

/// Search indexing configuration
#[derive(Debug, Clone)]
pub struct IndexingConfig {
    /// Number of transcripts indexed concurrently per batch
    pub batch_size: usize,
    /// Delay between batches in milliseconds
    pub batch_delay_ms: u64,
    /// Minimum token length kept by the tokenizer
    pub min_word_length: usize,
    /// Maximum number of tokens stored per index row
    pub max_tokens: usize,
    /// Whether common stop words are removed
    pub remove_stop_words: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> ServiceResult<Self> {
        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            tracing::warn!("Could not load .env file: {}", e);
        }

        let config = Config {
            environment: Environment::parse(
                &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            ),
            redis: RedisConfig {
                url: env::var("REDIS_URL")
                    .map_err(|_| ServiceError::ConfigError("REDIS_URL is required".to_string()))?,
                max_connections: parse_var("REDIS_MAX_CONNECTIONS", "10")?,
                connection_timeout_secs: parse_var("REDIS_CONNECTION_TIMEOUT_SECS", "5")?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| ServiceError::ConfigError("DATABASE_URL is required".to_string()))?,
                max_connections: parse_var("DB_MAX_CONNECTIONS", "10")?,
                statement_timeout_ms: parse_var("DB_STATEMENT_TIMEOUT_MS", "500")?,
            },
            ttl: CacheTtlConfig {
                transcript_secs: parse_var("CACHE_TRANSCRIPT_TTL_SECS", "86400")?,
                video_metadata_secs: parse_var("CACHE_VIDEO_METADATA_TTL_SECS", "86400")?,
                search_results_secs: parse_var("CACHE_SEARCH_RESULTS_TTL_SECS", "3600")?,
            },
            monitor: MonitorConfig {
                enabled: env::var("CACHE_MONITORING_ENABLED")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(true),
                interval_secs: parse_var("CACHE_MONITORING_INTERVAL_SECS", "300")?,
                min_hit_rate: parse_var("CACHE_MIN_HIT_RATE", "70")?,
                max_latency_ms: parse_var("CACHE_MAX_LATENCY_MS", "100")?,
                max_error_rate: parse_var("CACHE_MAX_ERROR_RATE", "5")?,
                key_count_warning: parse_var("CACHE_KEY_COUNT_WARNING", "10000")?,
            },
            indexing: IndexingConfig {
                batch_size: parse_var("INDEXING_BATCH_SIZE", "10")?,
                batch_delay_ms: parse_var("INDEXING_BATCH_DELAY_MS", "100")?,
                min_word_length: parse_var("INDEXING_MIN_WORD_LENGTH", "3")?,
                max_tokens: parse_var("INDEXING_MAX_TOKENS", "1000")?,
                remove_stop_words: env::var("INDEXING_REMOVE_STOP_WORDS")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(true),
            },
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ServiceResult<()> {
        // Validate Redis config
        if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://") {
            return Err(ServiceError::ConfigError(
                "REDIS_URL must start with redis:// or rediss://".to_string(),
            ));
        }

        if self.redis.connection_timeout_secs == 0 {
            return Err(ServiceError::ConfigError(
                "Redis connection timeout must be greater than 0".to_string(),
            ));
        }

        // Validate database config
        if !self.database.url.starts_with("postgresql://")
            && !self.database.url.starts_with("postgres://")
        {
            return Err(ServiceError::ConfigError(
                "DATABASE_URL must start with postgresql:// or postgres://".to_string(),
            ));
        }

        // Validate TTLs: all positive, search results expire no later than
        // the entries they are derived from
        if self.ttl.transcript_secs == 0
            || self.ttl.video_metadata_secs == 0
            || self.ttl.search_results_secs == 0
        {
            return Err(ServiceError::ConfigError(
                "Cache TTLs must be greater than 0".to_string(),
            ));
        }

        let min_entity_ttl = self.ttl.transcript_secs.min(self.ttl.video_metadata_secs);
        if self.ttl.search_results_secs > min_entity_ttl {
            return Err(ServiceError::ConfigError(
                "Search results TTL must not exceed transcript/metadata TTLs".to_string(),
            ));
        }

        // Validate monitor thresholds
        if self.monitor.interval_secs == 0 {
            return Err(ServiceError::ConfigError(
                "Monitoring interval must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.monitor.min_hit_rate)
            || !(0.0..=100.0).contains(&self.monitor.max_error_rate)
        {
            return Err(ServiceError::ConfigError(
                "Hit rate and error rate thresholds must be percentages".to_string(),
            ));
        }

        // Validate indexing config
        if self.indexing.batch_size == 0 {
            return Err(ServiceError::ConfigError(
                "Indexing batch size must be greater than 0".to_string(),
            ));
        }

        if self.indexing.max_tokens == 0 {
            return Err(ServiceError::ConfigError(
                "Indexing max tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> ServiceResult<T>
where
    T::Err: std::fmt::Display,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| ServiceError::ConfigError(format!("Invalid {}: {}", name, e)))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: Environment::Development,
            redis: RedisConfig {
                url: "".to_string(),
                max_connections: 10,
                connection_timeout_secs: 5,
            },
            database: DatabaseConfig {
                url: "".to_string(),
                max_connections: 10,
                statement_timeout_ms: 500,
            },
            ttl: CacheTtlConfig {
                transcript_secs: 86400,       // 24 hours
                video_metadata_secs: 86400,   // 24 hours
                search_results_secs: 3600,    // 1 hour
            },
            monitor: MonitorConfig {
                enabled: true,
                interval_secs: 300, // 5 minutes
                min_hit_rate: 70.0,
                max_latency_ms: 100.0,
                max_error_rate: 5.0,
                key_count_warning: 10_000,
            },
            indexing: IndexingConfig {
                batch_size: 10,
                batch_delay_ms: 100,
                min_word_length: 3,
                max_tokens: 1000,
                remove_stop_words: true,
            },
        }
    }
}
