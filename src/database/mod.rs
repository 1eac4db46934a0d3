/// Database module
///
/// Persistence seam for the cache and indexing services: transcript lookups
/// and partial updates, the derived search index rows, aggregate index
/// statistics and a liveness probe, implemented over Postgres.
mod postgres_client;
mod schema;

#[cfg(test)]
mod tests;

pub use postgres_client::PostgresStore;
pub use schema::DatabaseSchema;

use crate::error::ServiceResult;
use crate::types::{IndexStats, SearchIndexUpsert, Transcript, TranscriptUpdate};
use async_trait::async_trait;
use uuid::Uuid;

/// Relational store operations required by the cache core.
///
/// Unlike the cache path, store failures are real errors and propagate to
/// the caller. "Not found" is an expected outcome, not an error: lookups
/// return None and deletes report whether a row existed.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Fetch a transcript by row id; None when absent
    async fn find_transcript(&self, id: Uuid) -> ServiceResult<Option<Transcript>>;

    /// Apply a partial update; fails when the row does not exist
    async fn update_transcript(&self, id: Uuid, update: TranscriptUpdate) -> ServiceResult<()>;

    /// Insert or replace the search index row for a transcript
    async fn upsert_search_index(&self, entry: &SearchIndexUpsert) -> ServiceResult<()>;

    /// Delete the search index row; false when it was already absent
    async fn delete_search_index(&self, transcript_id: Uuid) -> ServiceResult<bool>;

    /// Ids of all completed transcripts
    async fn list_completed_transcript_ids(&self) -> ServiceResult<Vec<Uuid>>;

    /// Ids of completed transcripts lacking a search index row
    async fn list_unindexed_transcript_ids(&self) -> ServiceResult<Vec<Uuid>>;

    /// Aggregate index statistics, recomputed on every call
    async fn index_stats(&self) -> ServiceResult<IndexStats>;

    /// Liveness probe
    async fn ping(&self) -> ServiceResult<()>;
}
