use crate::cache::CacheService;
use crate::config::{Environment, MonitorConfig};
use crate::types::{
    CacheHealthReport, CacheMetrics, HealthStatus, MemoryStats, PerformanceMetrics,
    PerformanceRating, PerformanceSummary, RedisHealth,
};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Periodic cache health monitor.
///
/// Runs independently of request paths: a timer task probes backend
/// connectivity and the cache service metrics, classifies overall health and
/// retains the latest report for cheap access by health endpoints. The check
/// itself never fails; any unexpected fault is converted into an `unhealthy`
/// report.
pub struct CacheMonitor {
    cache: Arc<CacheService>,
    config: MonitorConfig,
    environment: Environment,
    last_report: Arc<RwLock<Option<CacheHealthReport>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CacheMonitor {
    /// Create a monitor over a cache service
    pub fn new(cache: Arc<CacheService>, config: MonitorConfig, environment: Environment) -> Self {
        CacheMonitor {
            cache,
            config,
            environment,
            last_report: Arc::new(RwLock::new(None)),
            task: Mutex::new(None),
        }
    }

    /// Start the periodic health check loop.
    ///
    /// Idempotent: a second call while the loop is running is a logged no-op.
    /// The first check runs immediately, then repeats on the interval
    /// (defaults to the configured value).
    pub fn start_monitoring(&self, interval: Option<Duration>) {
        let mut guard = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                warn!("Cache monitoring is already running, ignoring start request");
                return;
            }
        }

        let period = interval.unwrap_or(Duration::from_secs(self.config.interval_secs));
        let cache = self.cache.clone();
        let config = self.config.clone();
        let environment = self.environment;
        let last_report = self.last_report.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                // First tick fires immediately
                ticker.tick().await;
                let report = run_health_check(&cache, &config, environment).await;
                *last_report.write().await = Some(report);
            }
        });

        *guard = Some(handle);
        info!("Cache monitoring started (interval: {:?})", period);
    }

    /// Cancel the health check loop. Safe to call when not running.
    pub fn stop_monitoring(&self) {
        let mut guard = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match guard.take() {
            Some(handle) => {
                handle.abort();
                info!("Cache monitoring stopped");
            }
            None => debug!("Cache monitoring was not running"),
        }
    }

    /// Whether the monitoring loop is currently active
    pub fn is_monitoring(&self) -> bool {
        match self.task.lock() {
            Ok(guard) => guard.as_ref().map(|h| !h.is_finished()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Run one health check now and retain the report
    pub async fn perform_health_check(&self) -> CacheHealthReport {
        let report = run_health_check(&self.cache, &self.config, self.environment).await;
        *self.last_report.write().await = Some(report.clone());
        report
    }

    /// The most recent health report, if any check has run
    pub async fn get_last_health_report(&self) -> Option<CacheHealthReport> {
        self.last_report.read().await.clone()
    }

    /// Coarse performance rating with free-text insights, for dashboards
    pub fn get_performance_summary(&self) -> PerformanceSummary {
        let metrics = self.cache.get_metrics();
        let mut insights = Vec::new();

        let overall = if metrics.total_requests == 0 {
            insights.push("No cache requests recorded yet".to_string());
            PerformanceRating::Fair
        } else if metrics.hit_rate >= 90.0 && metrics.average_latency_ms < 50.0 {
            insights.push(format!(
                "Excellent cache hit rate ({:.2}%)",
                metrics.hit_rate
            ));
            PerformanceRating::Excellent
        } else if metrics.hit_rate >= 75.0 && metrics.average_latency_ms < 100.0 {
            insights.push(format!("Good cache hit rate ({:.2}%)", metrics.hit_rate));
            PerformanceRating::Good
        } else if metrics.hit_rate >= 50.0 {
            insights.push(format!(
                "Moderate cache hit rate ({:.2}%), many requests reach the store",
                metrics.hit_rate
            ));
            PerformanceRating::Fair
        } else {
            insights.push(format!(
                "Low cache hit rate ({:.2}%), most requests reach the store",
                metrics.hit_rate
            ));
            PerformanceRating::Poor
        };

        if metrics.average_latency_ms > 100.0 {
            insights.push(format!(
                "Average cache latency is {:.2}ms",
                metrics.average_latency_ms
            ));
        }

        if metrics.errors > 0 {
            insights.push(format!("{} cache errors recorded", metrics.errors));
        }

        PerformanceSummary {
            overall,
            metrics,
            insights,
        }
    }
}

/// Run one health check, converting any unexpected fault into a well-formed
/// unhealthy report. Monitoring must never take down the host process.
async fn run_health_check(
    cache: &CacheService,
    config: &MonitorConfig,
    environment: Environment,
) -> CacheHealthReport {
    let report = match AssertUnwindSafe(check_cache_health(cache, config))
        .catch_unwind()
        .await
    {
        Ok(report) => report,
        Err(panic) => {
            let message = panic_message(panic);
            error!("Cache health check failed unexpectedly: {}", message);
            failure_report(message)
        }
    };

    info!(
        status = report.status.as_str(),
        connected = report.redis.connected,
        hit_rate = report.performance.hit_rate,
        average_latency_ms = report.performance.average_latency_ms,
        error_rate = report.performance.error_rate,
        total_requests = report.performance.total_requests,
        key_count = report.memory.key_count,
        alerts = report.alerts.len(),
        "Cache health check completed"
    );

    if !environment.is_production() {
        for recommendation in &report.recommendations {
            debug!("Cache recommendation: {}", recommendation);
        }
    }

    report
}

async fn check_cache_health(cache: &CacheService, config: &MonitorConfig) -> CacheHealthReport {
    let mut status = HealthStatus::Healthy;
    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    let metrics = cache.get_metrics();
    let performance = performance_from(&metrics);

    let Some(latency_ms) = cache.ping_backend().await else {
        // A disconnected backend has no useful performance numbers;
        // threshold checks are skipped entirely.
        alerts.push("Cache backend is unreachable; requests fall back to the store".to_string());
        recommendations
            .push("Verify Redis connectivity and credentials".to_string());

        return CacheHealthReport {
            status: HealthStatus::Unavailable,
            redis: RedisHealth {
                connected: false,
                latency_ms: None,
                error: Some("not connected".to_string()),
            },
            performance,
            memory: MemoryStats {
                key_count: 0,
                memory_usage: None,
            },
            alerts,
            recommendations,
            timestamp: Utc::now(),
        };
    };

    // Threshold checks escalate severity and never lower it; with no
    // recorded requests the rate checks are skipped
    if metrics.total_requests > 0 && performance.hit_rate < config.min_hit_rate {
        status = status.escalate(HealthStatus::Degraded);
        alerts.push(format!(
            "Cache hit rate {:.2}% is below the {:.0}% threshold",
            performance.hit_rate, config.min_hit_rate
        ));
    }

    if performance.average_latency_ms > config.max_latency_ms {
        status = status.escalate(HealthStatus::Degraded);
        alerts.push(format!(
            "Average cache latency {:.2}ms exceeds the {:.0}ms threshold",
            performance.average_latency_ms, config.max_latency_ms
        ));
    }

    if metrics.total_requests > 0 && performance.error_rate > config.max_error_rate {
        status = status.escalate(HealthStatus::Unhealthy);
        alerts.push(format!(
            "Cache error rate {:.2}% exceeds the {:.0}% threshold",
            performance.error_rate, config.max_error_rate
        ));
    }

    let stats = cache.get_cache_stats().await;
    if stats.key_count > config.key_count_warning {
        recommendations.push(format!(
            "Key count {} exceeds {}; consider shorter TTLs or invalidating stale namespaces",
            stats.key_count, config.key_count_warning
        ));
    }

    CacheHealthReport {
        status,
        redis: RedisHealth {
            connected: true,
            latency_ms: Some(latency_ms),
            error: None,
        },
        performance,
        memory: MemoryStats {
            key_count: stats.key_count,
            memory_usage: stats.memory_usage,
        },
        alerts,
        recommendations,
        timestamp: Utc::now(),
    }
}

fn performance_from(metrics: &CacheMetrics) -> PerformanceMetrics {
    let error_rate = if metrics.total_requests > 0 {
        let rate = metrics.errors as f64 / metrics.total_requests as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    } else {
        0.0
    };

    PerformanceMetrics {
        hit_rate: metrics.hit_rate,
        average_latency_ms: metrics.average_latency_ms,
        error_rate,
        total_requests: metrics.total_requests,
    }
}

/// Report produced when the check itself faulted: unhealthy, zeroed
/// performance numbers, error message preserved
fn failure_report(message: String) -> CacheHealthReport {
    CacheHealthReport {
        status: HealthStatus::Unhealthy,
        redis: RedisHealth {
            connected: false,
            latency_ms: None,
            error: Some(message.clone()),
        },
        performance: PerformanceMetrics {
            hit_rate: 0.0,
            average_latency_ms: 0.0,
            error_rate: 0.0,
            total_requests: 0,
        },
        memory: MemoryStats {
            key_count: 0,
            memory_usage: None,
        },
        alerts: vec![format!("Health check failed: {}", message)],
        recommendations: Vec::new(),
        timestamp: Utc::now(),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
