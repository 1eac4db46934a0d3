pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod search;
pub mod types;

pub use cache::{BackendInfo, CacheMonitor, CacheService, KeyValueBackend, RedisBackend};
pub use config::{Config, Environment};
pub use database::{DatabaseSchema, PostgresStore, TranscriptStore};
pub use error::{ServiceError, ServiceResult};
pub use search::{SearchIndexingService, TokenizerOptions};
pub use types::*;
