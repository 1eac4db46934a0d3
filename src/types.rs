use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing state of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TranscriptStatus {
    /// String form used for the TEXT status column
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptStatus::Pending => "pending",
            TranscriptStatus::Processing => "processing",
            TranscriptStatus::Completed => "completed",
            TranscriptStatus::Failed => "failed",
        }
    }

    /// Parse the TEXT status column; unknown values map to Failed
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => TranscriptStatus::Pending,
            "processing" => TranscriptStatus::Processing,
            "completed" => TranscriptStatus::Completed,
            _ => TranscriptStatus::Failed,
        }
    }
}

/// A single timed utterance within a transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Start offset in seconds
    pub start_secs: f64,
    /// End offset in seconds
    pub end_secs: f64,
    /// Spoken text
    pub text: String,
    /// Speaker label when diarization produced one
    pub speaker: Option<String>,
}

/// Versioned transcript metadata
///
/// Decoded exactly once at the store boundary; every field except the
/// version is optional so that legacy rows decode to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    /// Payload schema version
    #[serde(default = "TranscriptMetadata::current_version")]
    pub version: u32,
    /// Ingestion source identifier
    #[serde(default)]
    pub source: Option<String>,
    /// Speech-to-text model that produced the transcript
    #[serde(default)]
    pub model: Option<String>,
    /// End-to-end processing time in milliseconds
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
    /// Word count of the full transcript text
    #[serde(default)]
    pub word_count: Option<u64>,
}

impl TranscriptMetadata {
    fn current_version() -> u32 {
        1
    }
}

impl Default for TranscriptMetadata {
    fn default() -> Self {
        TranscriptMetadata {
            version: Self::current_version(),
            source: None,
            model: None,
            processing_time_ms: None,
            word_count: None,
        }
    }
}

/// Full transcript row, also the cached transcript payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Database row id
    pub id: Uuid,
    /// External video identifier
    pub video_id: String,
    /// Video title
    pub title: String,
    /// Video description
    pub description: String,
    /// Video duration in seconds
    pub duration_secs: f64,
    /// Generated summary, present once the summarizer has run
    pub summary: Option<String>,
    /// Transcript language code (e.g. "en")
    pub language: String,
    /// Timed utterances
    pub utterances: Vec<Utterance>,
    /// Versioned metadata
    pub metadata: TranscriptMetadata,
    /// Processing state
    pub status: TranscriptStatus,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last row update time
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    /// Derive the video metadata cache payload from this transcript
    pub fn to_video_metadata(&self) -> VideoMetadata {
        VideoMetadata {
            video_id: self.video_id.clone(),
            title: self.title.clone(),
            channel: self.metadata.source.clone(),
            duration_secs: self.duration_secs,
            language: self.language.clone(),
            has_summary: self.summary.is_some(),
        }
    }
}

/// Video metadata cache payload, derived from the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// External video identifier
    pub video_id: String,
    /// Video title
    pub title: String,
    /// Channel or source name
    pub channel: Option<String>,
    /// Video duration in seconds
    pub duration_secs: f64,
    /// Transcript language code
    pub language: String,
    /// Whether a summary exists for the transcript
    pub has_summary: bool,
}

/// One cached search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// External video identifier
    pub video_id: String,
    /// Video title
    pub title: String,
    /// Matching text snippet
    pub snippet: String,
    /// Relevance score
    pub score: f32,
}

/// Output of the external summarizer collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSummary {
    /// Summary text
    pub summary: String,
    /// Key points extracted from the transcript
    pub key_points: Vec<String>,
    /// Language of the summary
    pub language: String,
}

/// Partial field set for updating a transcript row
#[derive(Debug, Clone, Default)]
pub struct TranscriptUpdate {
    pub summary: Option<String>,
    pub status: Option<TranscriptStatus>,
    pub metadata: Option<TranscriptMetadata>,
}

impl From<TranscriptSummary> for TranscriptUpdate {
    /// Build the store update applied when the summarizer finishes
    fn from(summary: TranscriptSummary) -> Self {
        TranscriptUpdate {
            summary: Some(summary.summary),
            status: Some(TranscriptStatus::Completed),
            metadata: None,
        }
    }
}

/// Persisted search index row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    /// Owning transcript id, unique per row
    pub transcript_id: Uuid,
    /// Concatenated searchable text
    pub content: String,
    /// Deduplicated, capped token set
    pub tokens: Vec<String>,
    /// Language of the indexed content
    pub language: String,
    /// Last index update time
    pub updated_at: DateTime<Utc>,
}

/// Fields written on a search index upsert
#[derive(Debug, Clone)]
pub struct SearchIndexUpsert {
    pub transcript_id: Uuid,
    pub content: String,
    pub tokens: Vec<String>,
    pub language: String,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time cache metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub total_requests: u64,
    /// hits / total_requests as a percentage, rounded to 2 decimals
    pub hit_rate: f64,
    pub average_latency_ms: f64,
}

/// Overall cache health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unavailable,
}

impl HealthStatus {
    /// Severity rank, higher is worse
    pub fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
            HealthStatus::Unavailable => 3,
        }
    }

    /// Return the more severe of two statuses; a status is never lowered
    pub fn escalate(self, other: HealthStatus) -> HealthStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unavailable => "unavailable",
        }
    }
}

/// Redis connectivity portion of a health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisHealth {
    pub connected: bool,
    /// Ping round-trip in milliseconds when connected
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
}

/// Performance portion of a health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub hit_rate: f64,
    pub average_latency_ms: f64,
    /// errors / total_requests as a percentage
    pub error_rate: f64,
    pub total_requests: u64,
}

/// Memory portion of a health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub key_count: u64,
    /// Human-readable memory figure when the backend exposes one
    pub memory_usage: Option<String>,
}

/// Point-in-time cache health report produced by each monitoring tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealthReport {
    pub status: HealthStatus,
    pub redis: RedisHealth,
    pub performance: PerformanceMetrics,
    pub memory: MemoryStats,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Coarse performance rating for dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Human-facing performance summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub overall: PerformanceRating,
    pub metrics: CacheMetrics,
    pub insights: Vec<String>,
}

/// Best-effort cache backend introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub key_count: u64,
    pub memory_usage: Option<String>,
    /// Set when the backend could not be queried
    pub error: Option<String>,
}

/// Per-language index count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageCount {
    pub language: String,
    pub count: u64,
}

/// Aggregate search index statistics, recomputed from the store on demand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_indexes: u64,
    pub indexes_by_language: Vec<LanguageCount>,
    pub average_token_count: f64,
    pub last_indexed: Option<DateTime<Utc>>,
    pub unindexed_count: u64,
}
