/// Caching module
///
/// Read-through/write-through caching for the transcript service:
/// - Redis backend adapter with fail-open semantics (`redis_client`)
/// - Typed, namespaced, metered cache facade (`CacheService`)
/// - Periodic health monitoring and alerting (`monitor`)
///
/// The cache is an optional accelerator: every failure in this module
/// degrades to a miss so callers fall back to the relational store.
mod monitor;
mod redis_client;


pub use monitor::CacheMonitor;
pub use redis_client::{BackendInfo, KeyValueBackend, RedisBackend};

use crate::config::CacheTtlConfig;
use crate::error::ServiceResult;
use crate::types::{CacheMetrics, CacheStatsReport, SearchHit, Transcript, VideoMetadata};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Key namespace for cached transcripts
const TRANSCRIPT_NAMESPACE: &str = "transcript";
/// Key namespace for cached video metadata
const VIDEO_METADATA_NAMESPACE: &str = "video-metadata";
/// Key namespace for cached search results
const SEARCH_RESULTS_NAMESPACE: &str = "search-results";

/// Internal cache metrics with atomic counters for thread safety
#[derive(Debug, Default)]
struct CacheMetricsInner {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    total_requests: AtomicU64,
    latency: Mutex<LatencyAverage>,
}

/// Running mean over every sample since the last reset; not a sliding window
#[derive(Debug, Default, Clone, Copy)]
struct LatencyAverage {
    average_ms: f64,
    samples: u64,
}

impl LatencyAverage {
    fn record(&mut self, sample_ms: f64) {
        self.samples += 1;
        self.average_ms =
            (self.average_ms * (self.samples - 1) as f64 + sample_ms) / self.samples as f64;
    }
}

/// Typed, namespaced, metered cache facade.
///
/// One get/set pair per entity kind, each with its own key namespace and
/// default TTL. All operations are best-effort: a failing backend shows up
/// as misses and error counts, never as errors returned to the caller.
pub struct CacheService {
    backend: Arc<dyn KeyValueBackend>,
    ttl: CacheTtlConfig,
    metrics: CacheMetricsInner,
}

impl CacheService {
    /// Create a cache service over a backend adapter
    pub fn new(backend: Arc<dyn KeyValueBackend>, ttl: CacheTtlConfig) -> Self {
        CacheService {
            backend,
            ttl,
            metrics: CacheMetricsInner::default(),
        }
    }

    // --- Transcript cache ---

    /// Fetch a cached transcript by video id
    pub async fn get_transcript(&self, video_id: &str) -> Option<Transcript> {
        self.get_entity(&transcript_key(video_id), "transcript").await
    }

    /// Cache a transcript, with an optional TTL override in seconds
    pub async fn set_transcript(
        &self,
        video_id: &str,
        transcript: &Transcript,
        ttl_secs: Option<u64>,
    ) {
        let ttl = ttl_secs.unwrap_or(self.ttl.transcript_secs);
        self.set_entity(&transcript_key(video_id), transcript, ttl, "transcript")
            .await;
    }

    // --- Video metadata cache ---

    /// Fetch cached video metadata by video id
    pub async fn get_video_metadata(&self, video_id: &str) -> Option<VideoMetadata> {
        self.get_entity(&video_metadata_key(video_id), "video metadata")
            .await
    }

    /// Cache video metadata, with an optional TTL override in seconds
    pub async fn set_video_metadata(
        &self,
        video_id: &str,
        metadata: &VideoMetadata,
        ttl_secs: Option<u64>,
    ) {
        let ttl = ttl_secs.unwrap_or(self.ttl.video_metadata_secs);
        self.set_entity(&video_metadata_key(video_id), metadata, ttl, "video metadata")
            .await;
    }

    // --- Search results cache ---

    /// Fetch cached search results for a query string
    pub async fn get_search_results(&self, query: &str) -> Option<Vec<SearchHit>> {
        self.get_entity(&search_results_key(query), "search results")
            .await
    }

    /// Cache search results for a query, with an optional TTL override
    pub async fn set_search_results(
        &self,
        query: &str,
        results: &[SearchHit],
        ttl_secs: Option<u64>,
    ) {
        let ttl = ttl_secs.unwrap_or(self.ttl.search_results_secs);
        self.set_entity(&search_results_key(query), &results.to_vec(), ttl, "search results")
            .await;
    }

    // --- Invalidation ---

    /// Remove the cached transcript AND video metadata for a video.
    ///
    /// Metadata is derived from the transcript, so the two entries are
    /// invalidated together; clearing only one would leave the other stale.
    pub async fn invalidate_transcript(&self, video_id: &str) {
        let keys = vec![transcript_key(video_id), video_metadata_key(video_id)];
        let deleted = self.backend.delete(&keys).await;
        debug!(
            "Invalidated {} cache entries for video {}",
            deleted, video_id
        );
    }

    /// Remove cached search results, optionally narrowed by a glob pattern
    /// within the search-results namespace
    pub async fn invalidate_search_results(&self, pattern: Option<&str>) {
        let full_pattern = match pattern {
            Some(p) => format!("{}:{}", SEARCH_RESULTS_NAMESPACE, p),
            None => format!("{}:*", SEARCH_RESULTS_NAMESPACE),
        };

        let keys = self.backend.keys_by_pattern(&full_pattern).await;
        if keys.is_empty() {
            debug!("No cached search results matched {}", full_pattern);
            return;
        }

        let deleted = self.backend.delete(&keys).await;
        info!("Invalidated {} cached search result sets", deleted);
    }

    /// Flush the entire cache. Refused in production by the backend guard.
    pub async fn clear_all_cache(&self) -> ServiceResult<()> {
        self.backend.flush_all().await?;
        info!("Cleared all cache entries");
        Ok(())
    }

    // --- Write-through refresh ---

    /// Repopulate the transcript and derived metadata entries after a store
    /// update (e.g. summary regeneration). Best-effort: failures are logged
    /// and must never fail the parent operation.
    pub async fn refresh_transcript(&self, transcript: &Transcript) {
        self.set_transcript(&transcript.video_id, transcript, None)
            .await;
        self.set_video_metadata(
            &transcript.video_id,
            &transcript.to_video_metadata(),
            None,
        )
        .await;
        debug!("Refreshed cache entries for video {}", transcript.video_id);
    }

    // --- Metrics & stats ---

    /// Snapshot the cache metrics
    pub fn get_metrics(&self) -> CacheMetrics {
        let hits = self.metrics.hits.load(Ordering::Relaxed);
        let misses = self.metrics.misses.load(Ordering::Relaxed);
        let errors = self.metrics.errors.load(Ordering::Relaxed);
        let total_requests = self.metrics.total_requests.load(Ordering::Relaxed);

        let hit_rate = if total_requests > 0 {
            round2(hits as f64 / total_requests as f64 * 100.0)
        } else {
            0.0
        };

        let average_latency_ms = self
            .metrics
            .latency
            .lock()
            .map(|avg| avg.average_ms)
            .unwrap_or(0.0);

        CacheMetrics {
            hits,
            misses,
            errors,
            total_requests,
            hit_rate,
            average_latency_ms,
        }
    }

    /// Zero all counters; used after a known anomaly or between benchmarks
    pub fn reset_metrics(&self) {
        self.metrics.hits.store(0, Ordering::Relaxed);
        self.metrics.misses.store(0, Ordering::Relaxed);
        self.metrics.errors.store(0, Ordering::Relaxed);
        self.metrics.total_requests.store(0, Ordering::Relaxed);
        if let Ok(mut latency) = self.metrics.latency.lock() {
            *latency = LatencyAverage::default();
        }
        info!("Cache metrics reset");
    }

    /// Backend key count and memory usage, degrading gracefully when the
    /// backend cannot be queried
    pub async fn get_cache_stats(&self) -> CacheStatsReport {
        match self.backend.info().await {
            Some(info) => CacheStatsReport {
                key_count: info.key_count,
                memory_usage: info.memory_usage_human,
                error: None,
            },
            None => CacheStatsReport {
                key_count: 0,
                memory_usage: None,
                error: Some("cache backend unavailable".to_string()),
            },
        }
    }

    /// Connectivity probe, delegated to the backend
    pub async fn ping_backend(&self) -> Option<f64> {
        self.backend.ping().await
    }

    // --- Internals ---

    async fn get_entity<T: DeserializeOwned>(&self, key: &str, kind: &str) -> Option<T> {
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let start = Instant::now();
        let raw = self.backend.get(key).await;
        self.record_latency(start.elapsed());

        match raw {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(value) => {
                    self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache HIT for {} ({})", key, kind);
                    Some(value)
                }
                Err(e) => {
                    self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                    warn!("Discarding corrupt cached {} at {}: {}", kind, key, e);
                    None
                }
            },
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache MISS for {} ({})", key, kind);
                None
            }
        }
    }

    async fn set_entity<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64, kind: &str) {
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to serialize {} for {}: {}", kind, key, e);
                return;
            }
        };

        let start = Instant::now();
        let written = self.backend.set_with_ttl(key, &payload, ttl_secs).await;
        self.record_latency(start.elapsed());

        if written {
            debug!("Cached {} at {} (ttl: {}s)", kind, key, ttl_secs);
        } else {
            self.metrics.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_latency(&self, elapsed: Duration) {
        if let Ok(mut latency) = self.metrics.latency.lock() {
            latency.record(elapsed.as_secs_f64() * 1000.0);
        }
    }
}

fn transcript_key(video_id: &str) -> String {
    format!("{}:{}", TRANSCRIPT_NAMESPACE, video_id)
}

fn video_metadata_key(video_id: &str) -> String {
    format!("{}:{}", VIDEO_METADATA_NAMESPACE, video_id)
}

/// Deterministic, non-cryptographic key for a search query. Queries are
/// normalized first so formatting differences map to the same entry.
fn search_results_key(query: &str) -> String {
    let normalized = query.trim().to_lowercase();
    format!(
        "{}:{}",
        SEARCH_RESULTS_NAMESPACE,
        farmhash::hash64(normalized.as_bytes())
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_latency_running_average() {
        let mut avg = LatencyAverage::default();
        avg.record(10.0);
        avg.record(20.0);
        avg.record(30.0);

        assert_eq!(avg.samples, 3);
        assert!((avg.average_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_search_key_is_deterministic_and_normalized() {
        let a = search_results_key("Rust Tutorial");
        let b = search_results_key("  rust tutorial  ");
        let c = search_results_key("rust tutorials");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("search-results:"));
    }

    #[test]
    fn test_namespaced_keys() {
        assert_eq!(transcript_key("abc123"), "transcript:abc123");
        assert_eq!(video_metadata_key("abc123"), "video-metadata:abc123");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.0 / 3.0 * 100.0), 33.33);
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round2(0.0), 0.0);
    }
}
